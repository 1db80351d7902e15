use serde::Deserialize;
use serde::Serialize;

/// One tag read as a reader reports it.
#[derive(Debug, Serialize, Deserialize)]
pub struct CardRequest {
    pub uid: String,
    pub device_id: String,
    pub pair_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BootRequest {
    pub device_id: String,
    pub pair_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleRequest {
    pub antenna_type_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}
