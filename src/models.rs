/// Data for the /endpoints catalogue.
/// Each entry describes one relayed operation: how it is called on the relay and where it lands
/// upstream.
use serde::Serialize;
use url::Url;

use crate::endpoint::{EndpointSpec, InboundMethod};
use crate::schema::ParamRule;

/// A single relayed operation as listed by the catalogue.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct CatalogueEntry {
    /// The operation name, e.g. `player_gains`.
    pub(crate) name: &'static str,
    /// The method the relay accepts for this operation.
    pub(crate) method: InboundMethod,
    /// The relay route, which is also the upstream path template.
    pub(crate) path: &'static str,
    /// The full upstream URL template.
    pub(crate) upstream: String,
    /// The parameter schema requests are validated against.
    pub(crate) params: &'static [ParamRule],
}

impl CatalogueEntry {
    pub(crate) fn from_spec(spec: &'static EndpointSpec, base_url: &Url) -> Self {
        CatalogueEntry {
            name: spec.name,
            method: spec.method,
            path: spec.path,
            upstream: format!("{}{}", base_url.as_str().trim_end_matches('/'), spec.path),
            params: spec.params,
        }
    }
}

/// The response from the /endpoints route.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct EndpointCatalogue {
    /// The object type, which is always "list".
    pub object: String,
    pub data: Vec<CatalogueEntry>,
}

impl EndpointCatalogue {
    pub(crate) fn from_table(table: &'static [EndpointSpec], base_url: &Url) -> Self {
        EndpointCatalogue {
            object: "list".into(),
            data: table
                .iter()
                .map(|spec| CatalogueEntry::from_spec(spec, base_url))
                .collect(),
        }
    }
}
