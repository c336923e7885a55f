/// Axum handlers for the relay
use crate::AppState;
use crate::client::HttpClient;
use crate::endpoint::{ENDPOINTS, EndpointSpec};
use crate::errors::RelayError;
use crate::models::EndpointCatalogue;
use crate::schema::{Location, ValidationError};
use axum::{
    Json,
    extract::{RawPathParams, State, rejection::RawPathParamsRejection},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

/// The generic handler behind every described endpoint.
///
/// Path captures are listed ahead of the query pairs, so a `username` in the query string cannot
/// replace the one in the path. A capture that does not decode to UTF-8 is reported against the
/// endpoint's path fields. The upstream status and JSON body are returned as-is.
#[instrument(skip(state, spec, path_params, query), fields(endpoint = spec.name))]
pub async fn relay_handler<T: HttpClient + Clone + Send + Sync + 'static>(
    state: AppState<T>,
    spec: &'static EndpointSpec,
    path_params: Result<RawPathParams, RawPathParamsRejection>,
    query: Vec<(String, String)>,
) -> Result<Response, RelayError> {
    let captures: Vec<(String, String)> = match path_params {
        Ok(path_params) => path_params
            .iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect(),
        Err(RawPathParamsRejection::MissingPathParams(_)) => Vec::new(),
        Err(rejection) => {
            warn!(error = %rejection, "Rejected path capture");
            let mut err = ValidationError::default();
            for rule in spec.params.iter().filter(|rule| rule.location == Location::Path) {
                err.push(
                    rule.name,
                    format!("The {} field must be a valid UTF-8 string.", rule.name),
                );
            }
            return Err(err.into());
        }
    };
    let params: Vec<(String, String)> = captures.into_iter().chain(query).collect();
    debug!("Relaying {} parameter(s)", params.len());

    let relayed = state.forwarder.relay(spec, &params).await?;
    Ok((relayed.status, Json(relayed.body)).into_response())
}

#[instrument(skip(state))]
pub async fn endpoints<T: HttpClient>(State(state): State<AppState<T>>) -> impl IntoResponse {
    Json(EndpointCatalogue::from_table(
        ENDPOINTS,
        state.forwarder.base_url(),
    ))
}
