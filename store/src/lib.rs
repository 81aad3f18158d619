//! ucistage Store
//!
//! A staged transaction engine for UCI configuration held on a remote
//! device.
//!
//! # Architecture
//!
//! - **Snapshot cache**: per-config state fetched with `uci get`, with
//!   concurrent loads sharing one fetch
//! - **Overlay**: uncommitted creates, option changes, deletions and reorder
//!   flags layered over the snapshot
//! - **Accessor and mutators**: reads merge snapshot and overlay; writes only
//!   ever touch the overlay
//! - **Commit**: `save` turns the overlay into `uci` calls, reconciles
//!   server-assigned names and reloads what it touched
//! - **Apply**: activates committed changes with a rollback timer and
//!   confirms them before it expires
//!
//! ```rust,no_run
//! use ucistage_rpc::{HttpTransport, UbusClient};
//! use ucistage_store::Store;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = UbusClient::new(HttpTransport::new("http://192.168.1.1/ubus")?);
//! let store = Store::new(client);
//!
//! store.load(&["network"]).await?;
//! store.set("network", "@interface[0]", "mtu", "1400");
//! store.save().await?;
//! store.apply(Some(30)).await?;
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod apply;
pub mod commit;
pub mod error;
pub mod json_config;
pub mod mutators;
pub mod overlay;
pub mod remote;
pub mod resolver;
pub mod settings;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use json_config::JsonConfig;
pub use overlay::Overlay;
pub use remote::UciRemote;
pub use resolver::SectionRef;
pub use settings::Settings;
pub use source::ConfigSource;
pub use state::State;
pub use store::{Store, StoreEvent};
pub use types::{Deletion, OptionValue, Section, SectionMap};
