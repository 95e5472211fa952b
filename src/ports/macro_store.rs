use crate::errors::CoreResult;
use crate::models::macros::{Macro, MacroTrigger};
use async_trait::async_trait;

#[async_trait]
pub trait MacroStore: Send + Sync {
    /// Active macros with the given trigger type, in no particular order;
    /// the selector owns ordering.
    async fn list_active_by_trigger(&self, trigger: MacroTrigger) -> CoreResult<Vec<Macro>>;

    async fn get(&self, macro_id: &str) -> CoreResult<Macro>;

    /// Insert or replace. Callers run `Macro::validate()` first; the store
    /// does not re-validate.
    async fn save(&self, macro_def: &Macro) -> CoreResult<()>;
}
