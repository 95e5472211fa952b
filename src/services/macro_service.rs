use crate::errors::{CoreError, CoreResult};
use crate::models::macros::{Combinator, Macro, MacroAction, MacroCondition, MacroTrigger};
use crate::ports::{Clock, MacroStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMacro {
    pub name: String,
    pub description: Option<String>,
    pub trigger: MacroTrigger,
    #[serde(default)]
    pub conditions: Vec<MacroCondition>,
    pub combinator: Combinator,
    pub actions: Vec<MacroAction>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    50
}

/// Administration of macro definitions. Validation runs here, before a
/// macro is stored, so a condition type mismatch can never surface during
/// live evaluation.
pub struct MacroService {
    macros: Arc<dyn MacroStore>,
    clock: Arc<dyn Clock>,
}

impl MacroService {
    pub fn new(macros: Arc<dyn MacroStore>, clock: Arc<dyn Clock>) -> Self {
        Self { macros, clock }
    }

    pub async fn get_macro(&self, macro_id: &str) -> CoreResult<Macro> {
        self.macros.get(macro_id).await
    }

    pub async fn create_macro(&self, input: CreateMacro) -> CoreResult<Macro> {
        let now = self.clock.now();
        let macro_def = Macro {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            trigger: input.trigger,
            conditions: input.conditions,
            combinator: input.combinator,
            actions: input.actions,
            keywords: normalize_keywords(input.keywords),
            active: true,
            priority: input.priority,
            created_at: now,
            updated_at: now,
        };

        macro_def
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        self.macros.save(&macro_def).await?;
        tracing::info!(macro_id = %macro_def.id, name = %macro_def.name, trigger = %macro_def.trigger, "macro created");
        Ok(macro_def)
    }

    /// Replace a macro definition. The edit is re-validated in full; an
    /// invalid edit never reaches the store.
    pub async fn update_macro(&self, mut macro_def: Macro) -> CoreResult<Macro> {
        // Ensure it exists before replacing.
        self.macros.get(&macro_def.id).await?;

        macro_def.keywords = normalize_keywords(macro_def.keywords);
        macro_def
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        macro_def.updated_at = self.clock.now();

        self.macros.save(&macro_def).await?;
        tracing::info!(macro_id = %macro_def.id, "macro updated");
        Ok(macro_def)
    }

    /// Soft-disable: the macro stops matching but its execution history
    /// keeps resolving.
    pub async fn disable_macro(&self, macro_id: &str) -> CoreResult<Macro> {
        let mut macro_def = self.macros.get(macro_id).await?;
        if macro_def.active {
            macro_def.active = false;
            macro_def.updated_at = self.clock.now();
            self.macros.save(&macro_def).await?;
            tracing::info!(macro_id = %macro_def.id, "macro disabled");
        }
        Ok(macro_def)
    }
}

fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
