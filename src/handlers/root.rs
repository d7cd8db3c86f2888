use crate::{
    error::{Error, Result},
    responses,
    server::AppState,
    storage::{ListInclude, ListOptions},
};
use axum::{extract::Query, http::Uri, response::Response};
use std::collections::BTreeSet;
use tracing::debug;

// Query parameters accepted by a bucket listing
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub cursor: Option<String>,
}

impl ListParams {
    /// Reads the listing parameters from a request URI. A repeated parameter
    /// keeps its first value; unknown parameters are ignored.
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map_err(|rejection| Error::InvalidRequest(rejection.body_text()))?;

        let mut params = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "prefix" => &mut params.prefix,
                "delimiter" => &mut params.delimiter,
                "cursor" => &mut params.cursor,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        Ok(params)
    }

    pub fn into_options(self) -> ListOptions {
        ListOptions {
            prefix: self.prefix,
            delimiter: self.delimiter,
            cursor: self.cursor,
            limit: None,
            include: BTreeSet::from([ListInclude::CustomMetadata, ListInclude::HttpMetadata]),
        }
    }
}

pub async fn list_objects(state: &AppState, uri: &Uri) -> Result<Response> {
    let options = ListParams::from_uri(uri)?.into_options();
    debug!("List options: {}", serde_json::to_string(&options)?);

    let listing = state.store.list(&options).await?;
    responses::listing_json(&listing)
}
