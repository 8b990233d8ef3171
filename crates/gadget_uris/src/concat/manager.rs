// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use container_config::ContainerConfig;
use serde_json::Value;
use tracing::{Level, event};

use super::{
    CONCAT_HOST_KEY, CONCAT_JS_SPLIT_TOKEN_KEY, CONCAT_MAX_URL_LENGTH_KEY, CONCAT_PATH_KEY, ConcatData, ConcatPart, ConcatType,
    ConcatUri, ConcatUriManager, ConcatVersioner, DEFAULT_MAX_URL_LENGTH,
};
use crate::common::{lookup, parameter, require};
use crate::params::{Param, flag, is_set};
use crate::{ConfigurationError, Uri, UriBuilder, UriStatus};

/// The standard [`ConcatUriManager`].
///
/// Batches are packed greedily: resources join the current URL for as long as it stays within
/// the container's maximum URL length, and a new URL is started on overflow. Order is always
/// preserved. A resource too long to fit into a URL on its own is passed through unconcatenated.
#[derive(Debug, Clone)]
pub struct DefaultConcatUriManager {
    config: Arc<dyn ContainerConfig>,
    versioner: Option<Arc<dyn ConcatVersioner>>,
    strict_parsing: bool,
}

/// Per-batch values that do not change while a batch is packed.
struct Layout<'a> {
    batch: &'a ConcatUri,
    host: String,
    path: String,
    split_token: Option<String>,
    max_url_length: usize,
}

impl DefaultConcatUriManager {
    /// Creates a manager reading hosts and paths from `config`.
    #[must_use]
    pub fn new(config: Arc<dyn ContainerConfig>) -> Self {
        Self {
            config,
            versioner: None,
            strict_parsing: false,
        }
    }

    /// Versions built URIs and validates inbound versions with `versioner`.
    #[must_use]
    pub fn with_versioner(mut self, versioner: Arc<dyn ConcatVersioner>) -> Self {
        self.versioner = Some(versioner);
        self
    }

    /// Rejects inbound URIs not addressed to the configured host and path.
    ///
    /// **Default**: disabled
    #[must_use]
    pub fn with_strict_parsing(mut self, strict_parsing: bool) -> Self {
        self.strict_parsing = strict_parsing;
        self
    }

    fn layout<'a>(&self, batch: &'a ConcatUri, adjacent: bool) -> Result<Layout<'a>, ConfigurationError> {
        let container = batch.container();
        let config = self.config.as_ref();

        let split_token = if adjacent {
            None
        } else {
            lookup(config, container, CONCAT_JS_SPLIT_TOKEN_KEY).filter(|token| token != "false")
        };

        let max_url_length = config
            .get_int(container, CONCAT_MAX_URL_LENGTH_KEY)
            .and_then(|length| usize::try_from(length).ok())
            .filter(|length| *length > 0)
            .unwrap_or(DEFAULT_MAX_URL_LENGTH);

        Ok(Layout {
            batch,
            host: require(config, container, CONCAT_HOST_KEY)?,
            path: require(config, container, CONCAT_PATH_KEY)?,
            split_token,
            max_url_length,
        })
    }

    fn physical_uri(layout: &Layout<'_>, resources: &[Uri], version: Option<&str>) -> Uri {
        let batch = layout.batch;
        let mut builder = UriBuilder::new();
        builder
            .set_authority(layout.host.as_str())
            .set_path(layout.path.as_str())
            .add_query_parameter(Param::Container.key(), batch.container());

        if let Some(gadget) = batch.gadget() {
            builder.add_query_parameter(Param::Gadget.key(), gadget);
        }
        builder
            .add_query_parameter(Param::Debug.key(), flag(batch.debug()))
            .add_query_parameter(Param::NoCache.key(), flag(batch.no_cache()));
        if let Some(refresh) = batch.refresh() {
            builder.add_query_parameter(Param::Refresh.key(), refresh.to_string());
        }
        if let Some(version) = version {
            builder.add_query_parameter(Param::Version.key(), version);
        }
        if let Some(concat_type) = batch.concat_type() {
            builder.add_query_parameter(Param::Type.key(), concat_type.type_param());
        }
        if let Some(token) = &layout.split_token {
            builder.add_query_parameter(Param::Json.key(), token.as_str());
        }
        for (index, resource) in resources.iter().enumerate() {
            builder.add_query_parameter((index + 1).to_string(), resource.to_string());
        }

        builder.build()
    }

    fn fits(layout: &Layout<'_>, uri: &Uri) -> bool {
        uri.to_string().len() <= layout.max_url_length
    }

    /// Versions a packed group of resources and builds its physical URL.
    fn finish(&self, layout: &Layout<'_>, resources: Vec<Uri>) -> ConcatPart {
        let batch = layout.batch;
        let version = self
            .versioner
            .as_ref()
            .filter(|_| !batch.no_cache())
            .and_then(|versioner| versioner.version(&resources, batch.container()))
            .filter(|version| !version.is_empty());

        let uri = Self::physical_uri(layout, &resources, version.as_deref());
        if version.is_some() && !Self::fits(layout, &uri) {
            event!(
                Level::WARN,
                message = "concat version longer than announced, emitting the URL unversioned",
                container = batch.container(),
                max_url_length = layout.max_url_length
            );
            return ConcatPart::concatenated(Self::physical_uri(layout, &resources, None), resources);
        }

        ConcatPart::concatenated(uri, resources)
    }

    fn make_batch(&self, batch: &ConcatUri, adjacent: bool) -> Result<ConcatData, ConfigurationError> {
        assert!(
            adjacent || batch.concat_type() != Some(ConcatType::Css),
            "CSS batches cannot be split, only adjacent concatenation is supported"
        );

        let layout = self.layout(batch, adjacent)?;
        let reserved = self
            .versioner
            .as_ref()
            .filter(|_| !batch.no_cache())
            .map(|versioner| "0".repeat(versioner.max_version_length()));
        let fits = |resources: &[Uri]| Self::fits(&layout, &Self::physical_uri(&layout, resources, reserved.as_deref()));

        let mut parts = Vec::new();
        let mut current: Vec<Uri> = Vec::new();

        for resource in batch.batch() {
            current.push(resource.clone());
            if fits(&current) {
                continue;
            }
            current.pop();

            if !current.is_empty() {
                parts.push(self.finish(&layout, std::mem::take(&mut current)));
            }

            if fits(std::slice::from_ref(resource)) {
                current.push(resource.clone());
            } else {
                event!(
                    Level::DEBUG,
                    message = "resource too long to concatenate, passing it through",
                    resource = %resource,
                    max_url_length = layout.max_url_length
                );
                parts.push(ConcatPart::pass_through(resource.clone()));
            }
        }

        if !current.is_empty() {
            parts.push(self.finish(&layout, current));
        }

        let snippets = match &layout.split_token {
            Some(token) => parts
                .iter()
                .filter(|part| part.is_concatenated())
                .flat_map(ConcatPart::resources)
                .map(|resource| {
                    let key = Value::from(resource.to_string());
                    (resource.clone(), format!("eval({token}[{key}]);"))
                })
                .collect(),
            None => HashMap::new(),
        };

        Ok(ConcatData::new(parts, snippets))
    }

    fn parse(&self, uri: &Uri) -> Result<ConcatUri, &'static str> {
        let parameters = uri.query_parameters();
        let get = |key: &str| parameter(&parameters, key).filter(|value| !value.is_empty());

        let container = get(Param::Container.key()).ok_or("missing container")?;

        if self.strict_parsing {
            let config = self.config.as_ref();
            let host = lookup(config, &container, CONCAT_HOST_KEY).ok_or("container has no concat host")?;
            let path = lookup(config, &container, CONCAT_PATH_KEY).ok_or("container has no concat path")?;
            if !uri.authority().is_some_and(|authority| authority.eq_ignore_ascii_case(&host)) || uri.path() != path {
                return Err("not addressed to the configured concat host and path");
            }
        }

        let mut batch = Vec::new();
        for index in 1.. {
            let Some(resource) = get(&index.to_string()) else {
                break;
            };
            batch.push(Uri::parse(&resource).map_err(|_| "malformed batch entry")?);
        }

        let concat_type = match get(Param::Type.key()) {
            Some(value) => ConcatType::parse(&value).ok_or("unknown concat type")?,
            None => get(Param::RewriteMime.key())
                .as_deref()
                .and_then(ConcatType::parse)
                .ok_or("missing concat type")?,
        };

        let refresh = get(Param::Refresh.key())
            .map(|refresh| refresh.parse::<u32>())
            .transpose()
            .map_err(|_| "malformed refresh")?;

        let split_param = match concat_type {
            ConcatType::Js => get(Param::Json.key()),
            ConcatType::Css => None,
        };

        let status = match (&self.versioner, get(Param::Version.key())) {
            (Some(versioner), Some(version)) => versioner.validate(&batch, &container, &version),
            _ => UriStatus::ValidUnversioned,
        };

        let mut concat = ConcatUri::new(container, concat_type, batch)
            .with_debug(is_set(get(Param::Debug.key()).as_deref()))
            .with_no_cache(is_set(get(Param::NoCache.key()).as_deref()))
            .with_refresh(refresh)
            .with_split_param(split_param)
            .with_status(status)
            .with_original(uri.clone());
        if let Some(gadget) = get(Param::Gadget.key()) {
            concat = concat.with_gadget(gadget);
        }

        Ok(concat)
    }
}

impl ConcatUriManager for DefaultConcatUriManager {
    fn make(&self, batches: &[ConcatUri], adjacent: bool) -> Result<Vec<ConcatData>, ConfigurationError> {
        batches.iter().map(|batch| self.make_batch(batch, adjacent)).collect()
    }

    fn process(&self, uri: &Uri) -> ConcatUri {
        self.parse(uri).unwrap_or_else(|reason| {
            event!(Level::DEBUG, message = "rejected concat URI", uri = %uri, reason);
            ConcatUri::bad(uri.query_parameter(Param::Container.key()), uri.clone())
        })
    }
}
