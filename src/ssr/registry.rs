use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use super::error::{SsrError, SsrResult};

/// A closed set of query keys fixed for an application.
///
/// Implement it with [`query_keys!`](crate::query_keys) rather than by hand.
pub trait QueryKey: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every key in the set.
    const ALL: &'static [Self];

    /// Identifier under which the key's result travels in the payload.
    fn as_str(&self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|candidate| candidate.as_str() == key)
    }
}

/// Declares an enum implementing [`QueryKey`](crate::ssr::QueryKey).
///
/// ```
/// firebase_ssr::query_keys! {
///     pub enum PageQuery {
///         Burrito => "burritoDocument",
///         Menu => "menuCollection",
///     }
/// }
///
/// use firebase_ssr::ssr::QueryKey;
/// assert_eq!(PageQuery::Burrito.as_str(), "burritoDocument");
/// assert_eq!(PageQuery::from_key("menuCollection"), Some(PageQuery::Menu));
/// ```
#[macro_export]
macro_rules! query_keys {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident => $key:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$variant_meta])* $variant ),+
        }

        impl $crate::ssr::QueryKey for $name {
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $key ),+
                }
            }
        }
    };
}

pub(crate) fn validate_key_set<K: QueryKey>() -> SsrResult<()> {
    let mut seen = BTreeSet::new();
    for key in K::ALL {
        let name = key.as_str();
        if name.is_empty() {
            return Err(SsrError::InvalidQueryKey {
                key: format!("{key:?}"),
                message: "identifier must not be empty".to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(SsrError::DuplicateQueryKey {
                key: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::query_keys! {
        enum PageQuery {
            Burrito => "burritoDocument",
            Menu => "menuCollection",
        }
    }

    crate::query_keys! {
        enum Clashing {
            First => "shared",
            Second => "shared",
        }
    }

    crate::query_keys! {
        enum Blank {
            Nothing => "",
        }
    }

    #[test]
    fn keys_resolve_both_ways() {
        assert_eq!(PageQuery::ALL, &[PageQuery::Burrito, PageQuery::Menu]);
        assert_eq!(PageQuery::Menu.as_str(), "menuCollection");
        assert_eq!(PageQuery::from_key("burritoDocument"), Some(PageQuery::Burrito));
        assert_eq!(PageQuery::from_key("tacoDocument"), None);
    }

    #[test]
    fn key_sets_must_be_unique_and_non_empty() {
        assert!(validate_key_set::<PageQuery>().is_ok());
        assert_eq!(
            validate_key_set::<Clashing>().unwrap_err(),
            SsrError::DuplicateQueryKey {
                key: "shared".into()
            }
        );
        assert_eq!(
            validate_key_set::<Blank>().unwrap_err().code_str(),
            "ssr/invalid-query-key"
        );
    }
}
