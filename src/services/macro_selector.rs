use crate::events::TriggerEvent;
use crate::models::macros::{Macro, MacroTrigger};
use crate::models::ticket::Ticket;

/// Order and filter the candidate macros for one trigger event.
///
/// Keeps macros that are active, whose trigger type the event activates,
/// and (for keyword macros) whose keyword list has at least one
/// case-insensitive substring match against the ticket's content. The
/// result is sorted by priority descending, ties broken by macro id
/// ascending so a pass is deterministic; ordering matters because later
/// macros observe the ticket as mutated by earlier ones.
pub fn select(mut macros: Vec<Macro>, event: &TriggerEvent, ticket: &Ticket) -> Vec<Macro> {
    let content = ticket.content().to_lowercase();

    macros.retain(|m| {
        m.active
            && event.activates(m.trigger)
            && (m.trigger != MacroTrigger::Keyword || keyword_match(&m.keywords, &content))
    });

    macros.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
    macros
}

fn keyword_match(keywords: &[String], content: &str) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && content.contains(&k.to_lowercase()))
}
