//! The table of described endpoints and upstream URL construction.
//!
//! Every relayed operation is a row in [`ENDPOINTS`]: a name, the inbound method, a path template
//! and a parameter schema. The inbound route uses the same template as the upstream path, so
//! `/players/{username}/groups` on the relay maps onto `{base}/players/{username}/groups`.
use crate::schema::{Location, ParamRule, ValidatedParams};
use serde::Serialize;
use url::Url;

/// The base URL of the Wise Old Man v2 API.
pub const DEFAULT_BASE_URL: &str = "https://api.wiseoldman.net/v2";

const COMPETITION_STATUS: &[&str] = &["upcoming", "ongoing", "finished"];

const PERIOD: &[&str] = &["five_min", "day", "week", "month", "year"];

/// The method an endpoint is exposed under on the relay. Upstream calls are always GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InboundMethod {
    Get,
    Post,
}

/// A relayed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub method: InboundMethod,
    pub path: &'static str,
    pub params: &'static [ParamRule],
}

impl EndpointSpec {
    pub fn find(name: &str) -> Option<&'static EndpointSpec> {
        ENDPOINTS.iter().find(|spec| spec.name == name)
    }
}

const USERNAME: ParamRule = ParamRule::path("username");

pub static ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "search_players",
        method: InboundMethod::Get,
        path: "/players/search",
        params: &[
            ParamRule::query("username").required(),
            ParamRule::query("limit").integer(),
            ParamRule::query("offset").integer(),
        ],
    },
    EndpointSpec {
        name: "update_player",
        method: InboundMethod::Post,
        path: "/players/{username}",
        params: &[USERNAME],
    },
    EndpointSpec {
        name: "assert_player_type",
        method: InboundMethod::Post,
        path: "/players/{username}/assert-type",
        params: &[USERNAME],
    },
    EndpointSpec {
        name: "player_details",
        method: InboundMethod::Get,
        path: "/players/{username}",
        params: &[USERNAME],
    },
    EndpointSpec {
        name: "player_details_by_id",
        method: InboundMethod::Get,
        path: "/players/id/{id}",
        params: &[ParamRule::path("id").integer()],
    },
    EndpointSpec {
        name: "player_achievements",
        method: InboundMethod::Get,
        path: "/players/{username}/achievements",
        params: &[USERNAME],
    },
    EndpointSpec {
        name: "player_achievement_progress",
        method: InboundMethod::Get,
        path: "/players/{username}/achievements/progress",
        params: &[USERNAME],
    },
    EndpointSpec {
        name: "player_competitions",
        method: InboundMethod::Get,
        path: "/players/{username}/competitions",
        params: &[
            USERNAME,
            ParamRule::query("status").one_of(COMPETITION_STATUS),
            ParamRule::query("limit").integer(),
            ParamRule::query("offset").integer(),
        ],
    },
    EndpointSpec {
        name: "player_competition_standings",
        method: InboundMethod::Get,
        path: "/players/{username}/competitions/standings",
        params: &[
            USERNAME,
            ParamRule::query("status")
                .required()
                .one_of(COMPETITION_STATUS),
        ],
    },
    EndpointSpec {
        name: "player_groups",
        method: InboundMethod::Get,
        path: "/players/{username}/groups",
        params: &[
            USERNAME,
            ParamRule::query("limit").integer(),
            ParamRule::query("offset").integer(),
        ],
    },
    EndpointSpec {
        name: "player_gains",
        method: InboundMethod::Get,
        path: "/players/{username}/gained",
        params: &[
            USERNAME,
            ParamRule::query("period").one_of(PERIOD),
            ParamRule::query("startDate"),
            ParamRule::query("endDate"),
        ],
    },
    EndpointSpec {
        name: "player_records",
        method: InboundMethod::Get,
        path: "/players/{username}/records",
        params: &[
            USERNAME,
            ParamRule::query("period").one_of(PERIOD),
            ParamRule::query("metric"),
        ],
    },
    EndpointSpec {
        name: "player_snapshots",
        method: InboundMethod::Get,
        path: "/players/{username}/snapshots",
        params: &[
            USERNAME,
            ParamRule::query("period").one_of(PERIOD),
            ParamRule::query("startDate"),
            ParamRule::query("endDate"),
        ],
    },
    EndpointSpec {
        name: "player_snapshots_timeline",
        method: InboundMethod::Get,
        path: "/players/{username}/snapshots/timeline",
        params: &[
            USERNAME,
            ParamRule::query("metric").required(),
            ParamRule::query("period").one_of(PERIOD),
            ParamRule::query("startDate"),
            ParamRule::query("endDate"),
        ],
    },
    EndpointSpec {
        name: "player_name_changes",
        method: InboundMethod::Get,
        path: "/players/{username}/names",
        params: &[USERNAME],
    },
    EndpointSpec {
        name: "player_archives",
        method: InboundMethod::Get,
        path: "/players/{username}/archives",
        params: &[USERNAME],
    },
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("No value for path placeholder '{0}'")]
    MissingPathParam(String),
    #[error("Path placeholder '{0}' resolves to a dot segment")]
    DotSegment(String),
    #[error("Base URL '{0}' cannot carry a path")]
    CannotBeABase(String),
}

/// Builds the upstream URL for `template` under `base`.
///
/// `{name}` placeholders are replaced by the validated value, encoded as a single path segment.
/// Query parameters present in `params` are appended in declaration order; when none are present
/// the URL has no `?`.
pub fn build_endpoint(
    base: &Url,
    template: &str,
    params: &ValidatedParams,
) -> Result<String, EndpointError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| EndpointError::CannotBeABase(base.to_string()))?;
        segments.pop_if_empty();
        for segment in template.split('/').filter(|s| !s.is_empty()) {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| EndpointError::MissingPathParam(name.to_owned()))?;
                    if matches!(value, "." | "..") {
                        return Err(EndpointError::DotSegment(name.to_owned()));
                    }
                    segments.push(value);
                }
                None => {
                    segments.push(segment);
                }
            }
        }
    }

    url.set_query(None);
    let mut query = params.at(Location::Query).peekable();
    if query.peek().is_some() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url.to_string())
}
