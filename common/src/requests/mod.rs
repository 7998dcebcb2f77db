use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
/// Request payload for the scan start endpoint.
/// Contains the root directory whose subdirectories are the products.
pub struct StartScanRequest {
    pub directory: String,
}
