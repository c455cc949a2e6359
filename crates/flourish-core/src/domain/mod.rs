//! Domain model (state, plants, classification, messages, ...).

pub mod classifier;
pub mod errors;
pub mod events;
pub mod ids;
pub mod message;
pub mod plant;
pub mod reconciler;
pub mod site;
pub mod state;

pub use classifier::{Classification, classify, domain_matches, normalize_domain};
pub use errors::{BusError, ConfigError, FlourishError, MessageError, StoreError, TabError};
pub use events::Broadcast;
pub use ids::PlantId;
pub use message::{Request, Response, SiteList};
pub use plant::{Plant, PlantType, total_mass};
pub use reconciler::{GardenRules, PlantReconciler, ReconcileReport};
pub use site::{extract_host, is_internal_url, parse_site_input};
pub use state::{FlourishState, StateKey};
