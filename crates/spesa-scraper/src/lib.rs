pub mod client;
pub mod discovery;
pub mod error;
pub mod harvest;
pub mod normalize;
pub mod resolver;
pub mod retry;
pub mod runner;
pub mod score;
pub mod topology;
pub mod transport;
pub mod types;

pub use client::{pickup_entry, Endpoints, FetchSettings, SpesaClient, StoreSession};
pub use discovery::{discover_pickup_points, discover_streets, PickupDiscovery, StreetDiscovery};
pub use error::{ErrorClass, ScraperError};
pub use harvest::{harvest_all, HarvestFailure, HarvestReport, HarvestedCatalog};
pub use normalize::{normalize_catalog, normalize_products};
pub use resolver::{
    select_best, FailedResolution, ResolutionReport, ResolutionSummary, StoreResolver,
};
pub use retry::{Backoff, RetryPolicy};
pub use runner::{TaskFailure, TaskOutcome, TaskReport, TaskRunner};
pub use score::{score, CatalogProfile, Similarity};
pub use topology::{ProbeFailure, TopologyMap, TopologyMapper};
pub use transport::{HttpResponse, HttpSession, HttpTransport, ReqwestTransport};
