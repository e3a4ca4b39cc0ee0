// Device endpoints
//
// All device routes live under the panel namespace. Mutating routes reply
// with a small status object rather than the updated record, so callers
// re-fetch the device list afterwards. An empty reply body counts as
// success.

use tracing::debug;

use crate::client::PanelClient;
use crate::error::Error;
use crate::models::{DeviceRecord, StatusResponse};

impl PanelClient {
    /// List all devices with their sensors.
    ///
    /// `GET {ns}/devices`
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        let url = self.ns_url("devices")?;
        self.get(url).await
    }

    /// Create (no `id`) or update (with `id`) a device.
    ///
    /// `POST {ns}/device`
    pub async fn save_device(&self, device: &DeviceRecord) -> Result<(), Error> {
        let url = self.ns_url("device")?;
        debug!(name = %device.name, id = ?device.id, "saving device");
        let resp: Option<StatusResponse> = self.post(url, device).await?;
        resp.map_or(Ok(()), StatusResponse::into_result)
    }

    /// Delete a device and its sensors.
    ///
    /// `DELETE {ns}/device?id={id}`
    pub async fn delete_device(&self, id: i64) -> Result<(), Error> {
        let mut url = self.ns_url("device")?;
        url.query_pairs_mut().append_pair("id", &id.to_string());
        debug!(id, "deleting device");
        let resp: Option<StatusResponse> = self.delete(url).await?;
        resp.map_or(Ok(()), StatusResponse::into_result)
    }

    /// Ask the backend to drop and re-open its connection to a device.
    ///
    /// `GET {ns}/reconnect/{id}`
    pub async fn reconnect_device(&self, id: i64) -> Result<(), Error> {
        let url = self.ns_url(&format!("reconnect/{id}"))?;
        debug!(id, "reconnecting device");
        let resp: Option<StatusResponse> = self.get(url).await?;
        resp.map_or(Ok(()), StatusResponse::into_result)
    }
}
