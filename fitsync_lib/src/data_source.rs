use serde::{Deserialize, Serialize};
use stack_string::StackString;

use crate::{data_point::WEIGHT_DATA_TYPE, weight_record::TrackerDevice};

pub const APPLICATION_NAME: &str = "fitsync";
pub const DATA_SOURCE_ID_SEPARATOR: &str = ":";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataSourceApplication {
    pub name: StackString,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataTypeField {
    pub format: StackString,
    pub name: StackString,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    pub name: StackString,
    pub field: Vec<DataTypeField>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataSourceDevice {
    #[serde(rename = "type")]
    pub device_type: StackString,
    pub manufacturer: StackString,
    pub model: StackString,
    pub uid: StackString,
    pub version: StackString,
}

/// The Google Fit data source that weight points are written to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataSourceDescriptor {
    #[serde(rename = "type")]
    pub source_type: StackString,
    pub application: DataSourceApplication,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    pub device: DataSourceDevice,
}

impl DataSourceDescriptor {
    /// Raw weight stream for the given scale.
    #[must_use]
    pub fn weight_scale(scale: &TrackerDevice) -> Self {
        Self {
            source_type: "raw".into(),
            application: DataSourceApplication {
                name: APPLICATION_NAME.into(),
            },
            data_type: DataType {
                name: WEIGHT_DATA_TYPE.into(),
                field: vec![DataTypeField {
                    format: "floatPoint".into(),
                    name: "weight".into(),
                }],
            },
            device: DataSourceDevice {
                device_type: "scale".into(),
                manufacturer: "unknown".into(),
                model: "unknown".into(),
                uid: scale.id.clone(),
                version: scale.device_version.clone(),
            },
        }
    }

    /// `type:dataType.name:project_number:manufacturer:model:uid`
    #[must_use]
    pub fn data_source_id(&self, project_number: &str) -> StackString {
        [
            self.source_type.as_str(),
            self.data_type.name.as_str(),
            project_number,
            self.device.manufacturer.as_str(),
            self.device.model.as_str(),
            self.device.uid.as_str(),
        ]
        .join(DATA_SOURCE_ID_SEPARATOR)
        .into()
    }
}
