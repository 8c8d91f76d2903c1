//! Typed pipeline stages.
//!
//! A pipeline is an ordered list of stages; each stage is an ordered list of
//! parts (elements with properties, or caps strings). The capability matrix
//! stores static stage templates; builders instantiate them with concrete
//! dimensions and the renderer turns the result into a `gst-launch-1.0`
//! fragment. Keeping assembly typed keeps the codec-aware option policy
//! testable without string matching.

/// One link in a stage: a GStreamer element with ordered properties, or a
/// capsfilter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePart {
    Element {
        factory: String,
        props: Vec<(String, String)>,
    },
    Caps(String),
}

impl StagePart {
    pub fn element(factory: &str) -> Self {
        StagePart::Element {
            factory: factory.to_string(),
            props: Vec::new(),
        }
    }

    pub fn element_with(factory: &str, props: Vec<(String, String)>) -> Self {
        StagePart::Element {
            factory: factory.to_string(),
            props,
        }
    }

    pub fn caps(caps: &str) -> Self {
        StagePart::Caps(caps.to_string())
    }

    pub fn render(&self) -> String {
        match self {
            StagePart::Element { factory, props } => {
                let mut out = factory.clone();
                for (key, value) in props {
                    out.push(' ');
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                out
            }
            StagePart::Caps(caps) => caps.clone(),
        }
    }
}

/// An ordered chain of parts, rendered with `!` links.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stage {
    pub parts: Vec<StagePart>,
}

impl Stage {
    pub fn new(parts: Vec<StagePart>) -> Self {
        Stage { parts }
    }

    pub fn render(&self) -> String {
        self.parts
            .iter()
            .map(StagePart::render)
            .collect::<Vec<_>>()
            .join(" ! ")
    }

    /// Factory name of the first element part, if any. For encode templates
    /// this is the encoder element the option builder attaches properties to.
    pub fn first_element(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            StagePart::Element { factory, .. } => Some(factory.as_str()),
            StagePart::Caps(_) => None,
        })
    }
}

/// Static template form of a stage, as stored in the capability matrix.
/// Caps strings may carry `{width}`/`{height}`/`{format}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePart {
    Element(&'static str),
    Caps(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTemplate {
    pub parts: &'static [TemplatePart],
}

impl StageTemplate {
    pub const fn new(parts: &'static [TemplatePart]) -> Self {
        StageTemplate { parts }
    }

    /// Substitute `{key}` placeholders and produce a concrete stage.
    pub fn instantiate(&self, subs: &[(&str, String)]) -> Stage {
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                TemplatePart::Element(factory) => StagePart::element(factory),
                TemplatePart::Caps(caps) => {
                    let mut rendered = (*caps).to_string();
                    for (key, value) in subs {
                        rendered = rendered.replace(&format!("{{{key}}}"), value);
                    }
                    StagePart::Caps(rendered)
                }
            })
            .collect();
        Stage { parts }
    }

    /// Common case: width/height substitution only.
    pub fn instantiate_dims(&self, width: u32, height: u32) -> Stage {
        self.instantiate(&[
            ("width", width.to_string()),
            ("height", height.to_string()),
        ])
    }

    pub fn first_element(&self) -> Option<&'static str> {
        self.parts.iter().find_map(|p| match p {
            TemplatePart::Element(factory) => Some(*factory),
            TemplatePart::Caps(_) => None,
        })
    }
}
