use std::sync::Arc;

use super::state::{DehydratedState, DehydratedValue};

/// Prefetched results visible to the hydrated accessors of one render tree.
///
/// Cloning is cheap; clones share the same payload.
#[derive(Clone, Debug, Default)]
pub struct HydrationContext {
    state: Option<Arc<DehydratedState>>,
}

impl HydrationContext {
    /// A context without a payload. Accessors behave like plain live bindings.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(state: DehydratedState) -> Self {
        Self {
            state: Some(Arc::new(state)),
        }
    }

    pub fn from_optional(state: Option<DehydratedState>) -> Self {
        state.map(Self::new).unwrap_or_default()
    }

    pub fn is_available(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&DehydratedState> {
        self.state.as_deref()
    }

    pub fn lookup(&self, id: &str) -> Option<&DehydratedValue> {
        self.state.as_deref().and_then(|state| state.get(id))
    }
}

/// Makes `state` available to everything rendered inside `children`.
///
/// The context lives for the duration of the call unless a child keeps a clone.
pub fn hydrate<R>(
    state: Option<DehydratedState>,
    children: impl FnOnce(&HydrationContext) -> R,
) -> R {
    let context = HydrationContext::from_optional(state);
    log::debug!(
        "hydrating render tree with {} prefetched entries",
        context.state().map_or(0, DehydratedState::len)
    );
    children(&context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn children_see_the_provided_payload() {
        let state = DehydratedState::from_json_value(json!({"burritoDocument": {"yummy": true}}))
            .unwrap();
        let found = hydrate(Some(state), |context| {
            context.lookup("burritoDocument").cloned()
        });
        assert!(matches!(found, Some(DehydratedValue::Document(Some(_)))));
    }

    #[test]
    fn absent_payload_yields_an_empty_context() {
        hydrate(None, |context| {
            assert!(!context.is_available());
            assert!(context.lookup("burritoDocument").is_none());
        });
        assert!(!HydrationContext::none().is_available());
    }
}
