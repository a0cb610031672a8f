#![doc = include_str!("README.md")]
mod accessors;
mod addressing;
pub mod codec;
mod dehydrate;
mod error;
mod hydrate;
mod registry;
mod session;
mod state;

#[doc(inline)]
pub use accessors::{
    use_hydrated_firestore_collection_data, use_hydrated_firestore_collection_data_with_converter,
    use_hydrated_firestore_doc_data, use_hydrated_firestore_doc_data_with_converter,
};

#[doc(inline)]
pub use addressing::{PathAddressing, QueryAddressing, RegistryAddressing};

#[doc(inline)]
pub use codec::JsonObject;

#[doc(inline)]
pub use dehydrate::{dehydrate_collection, dehydrate_document, DehydrateRequest};

#[doc(inline)]
pub use error::{SsrError, SsrResult};

#[doc(inline)]
pub use hydrate::{hydrate, HydrationContext};

#[doc(inline)]
pub use registry::QueryKey;

#[doc(inline)]
pub use session::{initialize_path_ssr, initialize_ssr, SsrSession};

#[doc(inline)]
pub use state::{Dehydrated, DehydratedKind, DehydratedState, DehydratedValue, DEHYDRATED_STATE_PROP};
