//! Request surface for other mods: name formatting and variant queries over a
//! string-keyed message bus.

use thiserror::Error;

use crate::config::VarietyConfig;
use crate::naming::{guard_archive_prefix, image_name, season_tag};
use crate::resolver::{climate_variant, guard_variant};
use crate::world::WorldContext;

pub const GET_NUM_VARIANTS: &str = "getNumVariants";
pub const GET_SEASON_STR: &str = "getSeasonStr";
pub const GET_ARCHIVE_CURRENT_CLIMATE: &str = "getArchiveCurrentClimate";
pub const GET_IMAGE_NAME: &str = "getImageName";
pub const GET_IMAGE_NAME_CLIMATE: &str = "getImageNameClimate";
pub const GET_ARCHIVE_PREFIX: &str = "getArchivePrefix";
/// Response name used for every failure.
pub const ERROR_RESPONSE: &str = "error";

/// Loosely typed message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageArg {
    None,
    Int(i64),
    Str(String),
    List(Vec<MessageArg>),
}

impl From<i64> for MessageArg {
    fn from(value: i64) -> Self {
        MessageArg::Int(value)
    }
}

impl From<&str> for MessageArg {
    fn from(value: &str) -> Self {
        MessageArg::Str(value.to_string())
    }
}

impl From<String> for MessageArg {
    fn from(value: String) -> Self {
        MessageArg::Str(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("unknown message received ({0})")]
    Unknown(String),
    #[error("Data passed is invalid for {message}")]
    InvalidData { message: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    NumVariants,
    SeasonStr,
    ArchiveCurrentClimate {
        archive: u32,
    },
    ImageName {
        archive: u32,
        record: usize,
        frame: usize,
        face: u32,
        variant: u32,
        climate: Option<String>,
        season: String,
    },
    ArchivePrefix {
        archive: u32,
    },
}

/// Positional reader over a list payload.
struct Args<'a> {
    message: &'a str,
    items: &'a [MessageArg],
}

impl<'a> Args<'a> {
    fn list(message: &'a str, data: &'a MessageArg, len: usize) -> Result<Self, MessageError> {
        match data {
            MessageArg::List(items) if items.len() == len => Ok(Self { message, items }),
            other => Err(invalid(message, format!("expected a list of {len} values, got {other:?}"))),
        }
    }

    fn int<T: TryFrom<i64>>(&self, index: usize) -> Result<T, MessageError> {
        match self.items.get(index) {
            Some(MessageArg::Int(value)) => T::try_from(*value)
                .map_err(|_| invalid(self.message, format!("value {value} at {index} out of range"))),
            other => Err(invalid(self.message, format!("expected an integer at {index}, got {other:?}"))),
        }
    }

    fn string(&self, index: usize) -> Result<String, MessageError> {
        match self.items.get(index) {
            Some(MessageArg::Str(value)) => Ok(value.clone()),
            other => Err(invalid(self.message, format!("expected a string at {index}, got {other:?}"))),
        }
    }
}

fn invalid(message: &str, detail: String) -> MessageError {
    MessageError::InvalidData {
        message: message.to_string(),
        detail,
    }
}

fn single_archive(message: &str, data: &MessageArg) -> Result<u32, MessageError> {
    match data {
        MessageArg::Int(value) => {
            u32::try_from(*value).map_err(|_| invalid(message, format!("archive {value} out of range")))
        }
        other => Err(invalid(message, format!("expected an archive number, got {other:?}"))),
    }
}

impl Request {
    pub fn parse(message: &str, data: &MessageArg) -> Result<Self, MessageError> {
        match message {
            GET_NUM_VARIANTS => Ok(Request::NumVariants),
            GET_SEASON_STR => Ok(Request::SeasonStr),
            GET_ARCHIVE_CURRENT_CLIMATE => Ok(Request::ArchiveCurrentClimate {
                archive: single_archive(message, data)?,
            }),
            GET_ARCHIVE_PREFIX => Ok(Request::ArchivePrefix {
                archive: single_archive(message, data)?,
            }),
            GET_IMAGE_NAME => {
                let args = Args::list(message, data, 6)?;
                Ok(Request::ImageName {
                    archive: args.int(0)?,
                    record: args.int(1)?,
                    frame: args.int(2)?,
                    face: args.int(3)?,
                    variant: args.int(4)?,
                    climate: None,
                    season: args.string(5)?,
                })
            }
            GET_IMAGE_NAME_CLIMATE => {
                let args = Args::list(message, data, 7)?;
                Ok(Request::ImageName {
                    archive: args.int(0)?,
                    record: args.int(1)?,
                    frame: args.int(2)?,
                    face: args.int(3)?,
                    variant: args.int(4)?,
                    climate: Some(args.string(5)?),
                    season: args.string(6)?,
                })
            }
            other => Err(MessageError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub name: String,
    pub payload: MessageArg,
}

impl Response {
    fn ok(name: &str, payload: impl Into<MessageArg>) -> Self {
        Self {
            name: name.to_string(),
            payload: payload.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.name == ERROR_RESPONSE
    }
}

/// Answer a parsed request against the current surroundings.
pub fn answer(request: &Request, world: &WorldContext, config: &VarietyConfig) -> Response {
    match request {
        Request::NumVariants => Response::ok(GET_NUM_VARIANTS, i64::from(config.num_variants)),
        Request::SeasonStr => Response::ok(GET_SEASON_STR, season_tag(world.season())),
        Request::ArchiveCurrentClimate { archive } => {
            Response::ok(GET_ARCHIVE_CURRENT_CLIMATE, climate_variant(*archive, world, config))
        }
        Request::ImageName {
            archive,
            record,
            frame,
            face,
            variant,
            climate,
            season,
        } => {
            let name = if climate.is_some() {
                GET_IMAGE_NAME_CLIMATE
            } else {
                GET_IMAGE_NAME
            };
            let climate = climate.as_deref().unwrap_or("");
            Response::ok(
                name,
                image_name(*archive, *record, *frame, *face, *variant, climate, season),
            )
        }
        Request::ArchivePrefix { archive } => {
            let tag = guard_variant(*archive, world, config);
            Response::ok(GET_ARCHIVE_PREFIX, guard_archive_prefix(*archive, tag.as_deref()))
        }
    }
}

/// Handle one bus message. Failures are logged and answered with an `"error"` response.
pub fn handle_message(
    message: &str,
    data: &MessageArg,
    world: &WorldContext,
    config: &VarietyConfig,
) -> Response {
    match Request::parse(message, data) {
        Ok(request) => answer(&request, world, config),
        Err(e) => {
            match &e {
                MessageError::Unknown(_) => log::error!("{}", e),
                MessageError::InvalidData { detail, .. } => {
                    log::error!("Error handling message ({}): {}", message, detail)
                }
            }
            Response::ok(ERROR_RESPONSE, e.to_string())
        }
    }
}
