//! HTML fragments the probe's pages are assembled from.
//!
//! The looped fragments (environment, locations, round-trip steps) are
//! handlebars templates registered once in [`Pages::new`]; the registry
//! escapes every interpolation with [`escape`]. The few fragments built with
//! `format!` escape their inputs by hand, since keys come straight from the
//! URL and environment values are arbitrary.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::cache::{RoundTripError, Trace};
use crate::config::{EnvSnapshot, Identity};

pub mod regions;

pub use regions::{REGIONS, Region};

/// A page fragment could not be registered or rendered.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Escapes the five characters that are significant in HTML text and
/// attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Wraps rendered fragments in a complete document.
pub fn document(identity: &Identity, fragments: &[String]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>kvprobe {}</title></head><body>\n",
        escape(identity.version)
    );
    for fragment in fragments {
        html.push_str(fragment);
        html.push('\n');
    }
    html.push_str("</body></html>\n");
    html
}

/// Which server answered, and from where.
pub fn banner(identity: &Identity) -> String {
    let place = match regions::find(&identity.location) {
        Some(region) => format!(
            "<b>{}</b> ({})",
            escape(region.name),
            escape(region.description)
        ),
        None => format!("<b>{}</b>", escape(&identity.location)),
    };
    format!(
        "<h3>Server version {}</h3><p>Served by <b>{}</b> from {place}</p>",
        escape(identity.version),
        escape(&identity.hostname),
    )
}

const LOCATIONS: &str = "locations";
const ACCORDION: &str = "accordion";
const TRACE: &str = "trace";

const LOCATIONS_TEMPLATE: &str = concat!(
    "<h4>GVC Locations:</h4><ul>",
    "{{#each items}}",
    "<li style=\"color: {{color}}; font-weight: {{weight}}\">{{name}}</li>",
    "{{/each}}",
    "</ul>",
);

const ACCORDION_TEMPLATE: &str = r#"<div class="accordion-container"><div class="accordion-header">Environment Variables</div><div class="accordion-body"><ul>{{#each vars}}<li>{{name}} = {{value}}</li>{{/each}}</ul></div></div>
<style>
  .accordion-container { width: 80%; margin: 0 auto; }
  .accordion-header { background-color: lightgray; cursor: pointer; padding: 18px; }
  .accordion-body { background-color: white; padding: 18px; display: none; }
</style>
<script>
  document.querySelectorAll(".accordion-header").forEach(header => {
    header.addEventListener("click", function () {
      const body = this.nextElementSibling;
      body.style.display = body.style.display === "block" ? "none" : "block";
    });
  });
</script>"#;

const TRACE_TEMPLATE: &str =
    "<br/>REDIS CLIENT<br/><br/>{{#each lines}}&nbsp;&nbsp;{{this}}<br/>{{/each}}<br/>";

#[derive(Serialize)]
struct LocationItem<'a> {
    name: &'a str,
    color: &'a str,
    weight: &'a str,
}

impl<'a> LocationItem<'a> {
    fn new(name: &'a str, highlight: Option<&'a str>) -> Self {
        match highlight {
            Some(color) => Self { name, color, weight: "bold" },
            None => Self { name, color: "grey", weight: "normal" },
        }
    }
}

#[derive(Serialize)]
struct EnvVar<'a> {
    name: &'a str,
    value: &'a str,
}

/// The template registry behind the looped fragments, built once at startup.
pub struct Pages {
    handlebars: Handlebars<'static>,
}

impl Pages {
    /// Registers every fragment template.
    ///
    /// # Errors
    ///
    /// [`PageError::Template`] if a built-in template does not parse.
    pub fn new() -> Result<Self, PageError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(escape);

        handlebars.register_template_string(LOCATIONS, LOCATIONS_TEMPLATE)?;
        handlebars.register_template_string(ACCORDION, ACCORDION_TEMPLATE)?;
        handlebars.register_template_string(TRACE, TRACE_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    /// Every known location, the current one in bold green, followed by the
    /// hostname (bold blue when the server runs outside any known location).
    pub fn location_list(&self, identity: &Identity) -> Result<String, PageError> {
        let items: Vec<LocationItem<'_>> = REGIONS
            .iter()
            .map(|region| {
                let current = region.name == identity.location;
                LocationItem::new(region.name, current.then_some("green"))
            })
            .chain(std::iter::once(LocationItem::new(
                &identity.hostname,
                identity.is_unplaced().then_some("blue"),
            )))
            .collect();

        Ok(self.handlebars.render(LOCATIONS, &json!({ "items": items }))?)
    }

    /// Collapsible `name = value` list of the captured environment.
    pub fn env_accordion(&self, env: &EnvSnapshot) -> Result<String, PageError> {
        let vars: Vec<EnvVar<'_>> = env
            .iter()
            .map(|(name, value)| EnvVar { name, value })
            .collect();

        Ok(self.handlebars.render(ACCORDION, &json!({ "vars": vars }))?)
    }

    /// The steps of a round trip, one indented line each.
    pub fn trace_block(&self, trace: &Trace) -> Result<String, PageError> {
        let lines: Vec<String> = trace.lines().collect();
        Ok(self.handlebars.render(TRACE, &json!({ "lines": lines }))?)
    }

    /// The steps a failed round trip got through, then the failure itself.
    pub fn error_block(&self, err: &RoundTripError) -> Result<String, PageError> {
        Ok(format!(
            "{}<p style=\"color: red;\">Exception:<br/>{}</p>",
            self.trace_block(err.trace())?,
            escape(&err.to_string())
        ))
    }
}

/// Link to the round trip for `key`.
pub fn round_trip_link(key: &str) -> String {
    format!(
        "<p><a href=\"/{}\">Run a cache round trip for {}</a></p>",
        escape(&urlencoding::encode(key)),
        escape(key)
    )
}
