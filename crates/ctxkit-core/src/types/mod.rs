//! Payload and metadata types shared by server and client.
//!
//! - [`Envelope`]: gives a bare value an object shape on the wire
//! - [`ListResponse`]: a single page of listed handlers
//! - [`RequestOptions`]: per-call settings, currently only a timeout
//! - [`LoggingLevel`]: the advisory log level of a session
//! - Parameter objects of every method, e.g. [`CallParams`]
//! - Handler metadata: [`ToolMetadata`], [`ResourceMetadata`], [`PromptMetadata`]

pub mod envelope;
pub mod list;
pub mod logging;
pub mod metadata;
pub mod options;
pub mod params;

pub use envelope::*;
pub use list::*;
pub use logging::*;
pub use metadata::*;
pub use options::*;
pub use params::*;
