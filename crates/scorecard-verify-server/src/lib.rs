//! HTTP front end for [`scorecard_verify`].
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /` | Service banner |
//! | `POST /projects/` | Verify the raw payload in the request body |
//! | `GET /healthz` | Liveness check |

pub mod routes;
pub mod telemetry;

pub use routes::{router, ApiError};
pub use telemetry::LogFormat;
