//! Persisted state is organized through [kv::KeyValueStore].
//! The basic idea is:
//!  - Every conceptual key (`smokingRecords`, `smokingSettings`, `appStartDate`) holds one JSON
//!    document.
//!  - [record_store::RecordStore], [settings_store::SettingsStore] and [anchor::AnchorDate] each
//!    own one key and never touch the others.
//!  - Reads degrade to empty/default state, writes report their errors.

pub mod anchor;
pub mod entities;
pub mod kv;
pub mod record_store;
pub mod settings_store;
