use async_trait::async_trait;
use stack_string::StackString;

use crate::{
    data_point::Dataset,
    data_source::DataSourceDescriptor,
    errors::FitsyncError as Error,
    user_timezone::UserTimezone,
    weight_record::{SourceWeightRecord, TrackerDevice},
};

/// Fitness tracker the weight logs are read from.
#[async_trait]
pub trait SourceClient: Send {
    async fn get_user_timezone(&mut self) -> Result<UserTimezone, Error>;

    async fn list_devices(&mut self) -> Result<Vec<TrackerDevice>, Error>;

    /// Weight logs for `period` (e.g. `1m`) ending today.
    async fn list_weight_entries(&mut self, period: &str)
        -> Result<Vec<SourceWeightRecord>, Error>;

    /// Persist refreshed tokens, returns `true` if the credentials file was
    /// rewritten.
    async fn save_credentials(&mut self) -> Result<bool, Error>;
}

/// Aggregation service the weight points are written to.
///
/// Implementations report a missing data source as
/// [`Error::NotFoundError`].
#[async_trait]
pub trait SinkClient: Send {
    /// Google Cloud project number used in data source ids.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if the credentials don't carry a client id
    fn project_number(&self) -> Result<StackString, Error>;

    async fn get_data_source(&mut self, data_source_id: &str) -> Result<(), Error>;

    async fn create_data_source(&mut self, descriptor: &DataSourceDescriptor)
        -> Result<(), Error>;

    async fn get_dataset(&mut self, data_source_id: &str, dataset_id: &str)
        -> Result<Dataset, Error>;

    async fn patch_dataset(
        &mut self,
        data_source_id: &str,
        dataset_id: &str,
        body: &Dataset,
    ) -> Result<(), Error>;

    async fn delete_dataset(&mut self, data_source_id: &str, dataset_id: &str)
        -> Result<(), Error>;

    async fn save_credentials(&mut self) -> Result<bool, Error>;
}
