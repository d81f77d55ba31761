//! Decides which tags a statement carries and where the comment goes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ApplicationIdentity;
use crate::config::{CommenterConfig, CommenterOptions};
use crate::context::{self, Context};
use crate::encoder::encode_comment;

const TERMINATOR: char = ';';

/// Builds annotated statements from a fixed configuration and static tags.
///
/// One `Commenter` is shared by every connection of a wrapped driver, so the
/// application identity is resolved once for all of them.
#[derive(Debug)]
pub struct Commenter {
    config: CommenterConfig,
    driver_name: String,
    application: Arc<ApplicationIdentity>,
}

impl Commenter {
    pub fn new(options: &CommenterOptions) -> Self {
        Self {
            config: options.config,
            driver_name: options.tags.driver_name.clone(),
            application: Arc::new(ApplicationIdentity::preset(options.tags.application.clone())),
        }
    }

    /// Share an application identity with other commenters.
    pub fn with_application(mut self, application: Arc<ApplicationIdentity>) -> Self {
        self.application = application;
        self
    }

    pub fn config(&self) -> &CommenterConfig {
        &self.config
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn application(&self) -> &Arc<ApplicationIdentity> {
        &self.application
    }

    /// Tags for one statement, evaluated in canonical order.
    pub fn tags(&self, ctx: &Context) -> BTreeMap<&'static str, String> {
        let mut tags = BTreeMap::new();

        if self.config.enable_action {
            insert_from(&mut tags, ctx, context::ACTION);
        }

        // Always the static name, never a context value, so callers cannot
        // misreport which driver ran the query.
        if self.config.enable_db_driver {
            tags.insert(context::DB_DRIVER, self.driver_name.clone());
        }

        if self.config.enable_framework {
            insert_from(&mut tags, ctx, context::FRAMEWORK);
        }

        if self.config.enable_route {
            insert_from(&mut tags, ctx, context::ROUTE);
        }

        if self.config.enable_traceparent {
            if let Some(traceparent) = ctx.traceparent() {
                tags.insert(context::TRACEPARENT, traceparent);
            }
        }

        if self.config.enable_application {
            tags.insert(context::APPLICATION, self.application.get().to_string());
        }

        if self.config.enable_controller {
            insert_from(&mut tags, ctx, context::CONTROLLER);
        }

        tags
    }

    /// Trim `query` and attach the encoded tags as a trailing comment.
    ///
    /// A trailing `;` stays the last character: the comment goes right
    /// before it. With no tags the trimmed statement is returned as is.
    pub fn with_comment(&self, ctx: &Context, query: &str) -> String {
        let query = query.trim();
        let tags = self.tags(ctx);
        if tags.is_empty() {
            return query.to_string();
        }

        let comment = format!("/*{}*/", encode_comment(&tags));
        let annotated = match query.strip_suffix(TERMINATOR) {
            Some(body) => format!("{body}{comment}{TERMINATOR}"),
            None => format!("{query}{comment}"),
        };

        tracing::trace!(statement = %annotated, "Annotated statement");
        annotated
    }
}

fn insert_from(tags: &mut BTreeMap<&'static str, String>, ctx: &Context, key: &'static str) {
    if let Some(value) = ctx.value(key) {
        tags.insert(key, value.to_string());
    }
}
