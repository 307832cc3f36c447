pub mod cli;
pub mod error;
pub mod hostname;
pub mod lookup;
pub mod record;
pub mod report;
pub mod session;

pub use cli::Cli;
pub use error::LookupError;
pub use hostname::{normalize, NormalizedHostname};
pub use lookup::{LookupGateway, WhoisCommand};
pub use record::{extract_date, ParsedRecord, RawRecord, RecordParser};
pub use report::Presenter;
pub use session::{QueryLoop, QueryOutcome, SessionSummary};
