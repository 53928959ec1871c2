#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::similar_names)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]

pub mod credential_store;
pub mod data_point;
pub mod data_source;
pub mod errors;
pub mod fitsync_config;
pub mod fitsync_sync;
pub mod fitsync_util;
pub mod sync_client;
pub mod user_timezone;
pub mod weight_record;
