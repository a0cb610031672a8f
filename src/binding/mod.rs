//! Live data bindings over Firestore reads.
//!
//! A binding starts either in [`ObservableStatus::Loading`] or, when seeded with
//! [`BindingOptions::initial_data`], directly in [`ObservableStatus::Success`].
//! The host drives delivery of live values by calling [`Observable::refresh`].
mod hooks;
mod observable;

pub use hooks::{
    use_firestore_collection_data, use_firestore_collection_data_with_converter,
    use_firestore_doc_data, use_firestore_doc_data_with_converter, BindingOptions,
};
pub use observable::{LoadFuture, Loader, Observable, ObservableStatus};
