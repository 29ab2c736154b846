//! Text and JSON renderers over a reconstructed [`Hierarchy`].
//!
//! Both come in a concise flavor (message chain only) and a trace flavor
//! (frames, annotation sites, branch labels). The `Custom` entry points take
//! a format description so callers can control separators and how a frame is
//! printed; the plain ones use the defaults below.

use serde_json::{Map, Value};

use crate::Fields;
use crate::capture::Location;
use crate::error::StackError;
use crate::unpack::{External, Hierarchy, unpack};

// ============================================================================
// format descriptions
// ============================================================================

/// Options shared by every renderer.
#[derive(Clone, Copy)]
pub struct FormatOptions {
    /// How a resolved frame is printed.
    pub location_format: fn(&Location) -> String,
    /// Whether to include stack frames, annotation sites, and branch labels.
    pub with_trace: bool,
}

/// `file:line(function)`.
pub fn default_location_format(location: &Location) -> String {
    format!("{}:{}({})", location.file, location.line, location.func)
}

/// The fields object serialized as compact JSON.
pub fn default_field_format(fields: &Fields) -> String {
    Value::Object(fields.clone()).to_string()
}

/// Text renderer description.
pub struct StringFormat {
    pub options: FormatOptions,
    /// Separator between an annotation site and its message.
    pub msg_stack_sep: String,
    /// Indent unit, repeated once per hierarchy level.
    pub pre_stack_sep: String,
    /// Separator after each stack frame.
    pub stack_elem_sep: String,
    /// Separator between errors in the chain.
    pub error_sep: String,
    /// How attached fields are printed.
    pub field_format: fn(&Fields) -> String,
}

impl StringFormat {
    /// The default separators for the given options: tab-indented lines with
    /// a trace, a `": "` joined chain without.
    pub fn new(options: FormatOptions) -> StringFormat {
        if options.with_trace {
            StringFormat {
                options,
                msg_stack_sep: "\n".to_string(),
                pre_stack_sep: "\t".to_string(),
                stack_elem_sep: "\n".to_string(),
                error_sep: "\n".to_string(),
                field_format: default_field_format,
            }
        } else {
            StringFormat {
                options,
                msg_stack_sep: String::new(),
                pre_stack_sep: String::new(),
                stack_elem_sep: String::new(),
                error_sep: ": ".to_string(),
                field_format: default_field_format,
            }
        }
    }
}

/// JSON renderer description.
pub struct JsonFormat {
    pub options: FormatOptions,
}

impl JsonFormat {
    pub fn new(options: FormatOptions) -> JsonFormat {
        JsonFormat { options }
    }
}

// ============================================================================
// text rendering
// ============================================================================

/// Render an error as text with the default format.
pub fn to_text(err: &(dyn std::error::Error + 'static), with_trace: bool) -> String {
    to_custom_text(
        err,
        StringFormat::new(FormatOptions {
            location_format: default_location_format,
            with_trace,
        }),
    )
}

/// Render an error as text with a caller-supplied format.
pub fn to_custom_text(err: &(dyn std::error::Error + 'static), format: StringFormat) -> String {
    let hierarchy = unpack(err);
    if format.options.with_trace {
        let mut out = String::new();
        render_trace(&hierarchy, &format, 1, &mut out);
        out
    } else {
        let mut parts = Vec::new();
        collect_concise(&hierarchy, &format, &mut parts);
        parts.join(&format.error_sep)
    }
}

/// The message chain as flat parts, outermost first, branches in order.
fn collect_concise(hierarchy: &Hierarchy<'_>, format: &StringFormat, parts: &mut Vec<String>) {
    for link in &hierarchy.links {
        let mut part = link.message.to_string();
        if let Some(fields) = link.fields {
            part.push(' ');
            part.push_str(&(format.field_format)(fields));
        }
        parts.push(part);
    }
    if let Some(external) = &hierarchy.external {
        parts.push(external_text(external));
    }
    for branch in &hierarchy.branches {
        collect_concise(branch, format, parts);
    }
}

fn render_trace(hierarchy: &Hierarchy<'_>, format: &StringFormat, level: usize, out: &mut String) {
    let location_format = format.options.location_format;
    let indent = format.pre_stack_sep.repeat(level);

    // Frames and links are interleaved by keeping a frame index in step with
    // the link being printed: frames up to a link's site print as plain
    // trace lines, the site itself prints with the message attached.
    let mut stack_index = 0;
    for link in &hierarchy.links {
        let reached =
            stack_index > 0 && hierarchy.frames.get(stack_index - 1) == Some(&link.location);
        if !reached {
            while stack_index < hierarchy.frames.len().saturating_sub(1)
                && hierarchy.frames[stack_index] != link.location
            {
                out.push_str(&indent);
                out.push_str(&location_format(&hierarchy.frames[stack_index]));
                out.push_str(&format.stack_elem_sep);
                stack_index += 1;
            }
            out.push_str(&indent);
            out.push_str(&location_format(&link.location));
            out.push_str(&format.msg_stack_sep);
            stack_index += 1;
        }
        out.push_str(link.message);
        if let Some(fields) = link.fields {
            out.push_str(&format.pre_stack_sep.repeat(level + 1));
            out.push_str(&(format.field_format)(fields));
        }
        out.push_str(&format.error_sep);
    }
    while stack_index < hierarchy.frames.len() {
        out.push_str(&indent);
        out.push_str(&location_format(&hierarchy.frames[stack_index]));
        out.push_str(&format.stack_elem_sep);
        stack_index += 1;
    }
    if let Some(external) = &hierarchy.external {
        out.push_str(&indent);
        out.push_str(&external_text(external));
        out.push_str(&format.error_sep);
    }
    for (i, branch) in hierarchy.branches.iter().enumerate() {
        out.push_str(&indent);
        out.push_str(&format!("#{i}"));
        out.push_str(&format.stack_elem_sep);
        render_trace(branch, format, level + 1, out);
    }
}

/// An external that is itself a capture-less structured error must not be
/// printed through `Display`, which would re-enter the renderer. Its own
/// message stands in.
fn external_text(external: &External<'_>) -> String {
    match external.error.downcast_ref::<StackError>() {
        Some(err) => err
            .delta()
            .map(|d| d.message().to_string())
            .unwrap_or_default(),
        None => external.error.to_string(),
    }
}

// ============================================================================
// JSON rendering
// ============================================================================

/// Render an error as a JSON value with the default format.
pub fn to_json(err: &(dyn std::error::Error + 'static), with_trace: bool) -> Value {
    to_custom_json(
        err,
        JsonFormat::new(FormatOptions {
            location_format: default_location_format,
            with_trace,
        }),
    )
}

/// Render an error as a JSON value with a caller-supplied format.
pub fn to_custom_json(err: &(dyn std::error::Error + 'static), format: JsonFormat) -> Value {
    render_json(&unpack(err), &format)
}

fn render_json(hierarchy: &Hierarchy<'_>, format: &JsonFormat) -> Value {
    let location_format = format.options.location_format;
    let mut root = Map::new();

    if format.options.with_trace && !hierarchy.frames.is_empty() {
        let stack = hierarchy
            .frames
            .iter()
            .map(|frame| Value::String(location_format(frame)))
            .collect();
        root.insert("stack".to_string(), Value::Array(stack));
    }
    if !hierarchy.links.is_empty() {
        let wraps = hierarchy
            .links
            .iter()
            .map(|link| {
                let mut wrap = Map::new();
                wrap.insert("msg".to_string(), Value::String(link.message.to_string()));
                if let Some(fields) = link.fields {
                    wrap.insert("fields".to_string(), Value::Object(fields.clone()));
                }
                if format.options.with_trace {
                    wrap.insert(
                        "src".to_string(),
                        Value::String(location_format(&link.location)),
                    );
                }
                Value::Object(wrap)
            })
            .collect();
        root.insert("wrap".to_string(), Value::Array(wraps));
    }
    if let Some(external) = &hierarchy.external {
        root.insert(
            "external".to_string(),
            Value::String(external_text(external)),
        );
        if format.options.with_trace
            && let Some(type_name) = external.type_name
        {
            root.insert("type".to_string(), Value::String(type_name.to_string()));
        }
    }
    if !hierarchy.branches.is_empty() {
        let branches = hierarchy
            .branches
            .iter()
            .map(|branch| render_json(branch, format))
            .collect();
        root.insert("join".to_string(), Value::Array(branches));
    }

    Value::Object(root)
}
