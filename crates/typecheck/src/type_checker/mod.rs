//! Documentation and call-site checks for one source.
//!
//! The lenient passes only look at YARD tags: every method needs a resolvable
//! `@return` tag and every parameter a resolvable `@param` tag, either its
//! own or one inherited from the method it overrides. The strict pass also
//! compares the tags against what the [`Probe`] infers from method bodies and
//! call arguments, and reports calls that cannot reach any method.

mod calls;
mod problem;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::api_map::{ApiMap, Probe};
use crate::error::Result;
use crate::pin::{Location, Pin};
use crate::source::Source;
use crate::source_map::SourceMap;

pub use problem::{Problem, Severity};

/// Which passes [`TypeChecker::problems`] runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    /// Documentation problems only.
    #[default]
    Normal,
    /// Documentation problems plus inferred type mismatches and unresolved
    /// calls.
    Strict,
}

impl FromStr for CheckLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown check level `{other}` (expected normal or strict)")),
        }
    }
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Checks one file of an [`ApiMap`] snapshot.
pub struct TypeChecker {
    filename: String,
    api_map: Arc<ApiMap>,
}

impl TypeChecker {
    pub fn new(filename: impl Into<String>, api_map: Arc<ApiMap>) -> Self {
        Self {
            filename: filename.into(),
            api_map,
        }
    }

    /// A checker over a snapshot holding only `code`.
    pub fn load_string(code: &str, filename: &str) -> Self {
        let source = Arc::new(Source::load_string(code, filename));
        Self::new(filename, Arc::new(ApiMap::from_sources(vec![source])))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = Arc::new(Source::load(path)?);
        let filename = source.filename().to_string();
        Ok(Self::new(filename, Arc::new(ApiMap::from_sources(vec![source]))))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn api_map(&self) -> &Arc<ApiMap> {
        &self.api_map
    }

    /// Every problem the passes of `level` report, in source order.
    pub fn problems(&self, level: CheckLevel) -> Vec<Problem> {
        let mut problems = self.return_type_problems();
        problems.extend(self.param_type_problems());
        if level == CheckLevel::Strict {
            problems.extend(self.strict_type_problems());
        }
        sort(&mut problems);
        problems
    }

    /// Methods without a `@return` tag, or whose tag names an unknown type.
    pub fn return_type_problems(&self) -> Vec<Problem> {
        let Some(map) = self.parsed_map() else {
            return Vec::new();
        };
        let probe = Probe::new(&self.api_map);
        let mut problems = Vec::new();
        for pin in map.method_pins() {
            if pin.is_attribute() && pin.name.ends_with('=') {
                continue;
            }
            match self.api_map.return_tag(pin) {
                None => {
                    let inferred = probe.infer_pin_type(pin);
                    let suggestion = inferred.is_defined().then(|| inferred.tag());
                    problems.push(
                        Problem::warning(
                            pin.location.clone(),
                            format!("`{}` has undefined @return type", pin.path),
                        )
                        .with_suggestion(suggestion),
                    );
                }
                Some((tag, namespace)) if !self.api_map.resolvable(&tag, &namespace) => {
                    problems.push(Problem::warning(
                        pin.location.clone(),
                        format!("`{}` has unresolved @return type `{}`", pin.path, tag),
                    ));
                }
                Some(_) => {}
            }
        }
        problems
    }

    /// `@param` tags naming no parameter, and parameters without a
    /// resolvable tag.
    pub fn param_type_problems(&self) -> Vec<Problem> {
        let Some(map) = self.parsed_map() else {
            return Vec::new();
        };
        let mut problems = Vec::new();
        for pin in map.method_pins().filter(|pin| !pin.is_attribute()) {
            self.check_param_tags(pin, &mut problems);
        }
        problems
    }

    fn check_param_tags(&self, pin: &Pin, problems: &mut Vec<Problem>) {
        let params = pin.parameters();
        let takes_any_keyword = params
            .iter()
            .any(|p| p.parameter_kind() == Some(crate::pin::ParameterKind::DoubleSplat));
        if !takes_any_keyword {
            for tag in pin.docstring.tags("param") {
                let Some(name) = tag.param.as_deref() else {
                    continue;
                };
                if !params.iter().any(|p| p.name == name) {
                    problems.push(Problem::warning(
                        pin.location.clone(),
                        format!("`{}` has unknown @param {}", pin.path, name),
                    ));
                }
            }
        }
        for param in params {
            if param.parameter_kind().is_some_and(|kind| kind.is_rest()) {
                continue;
            }
            match self.api_map.param_tag(pin, &param.name) {
                None => problems.push(Problem::warning(
                    pin.location.clone(),
                    format!("`{}` has undefined @param type for {}", pin.path, param.name),
                )),
                Some((tag, namespace)) if !self.api_map.resolvable(&tag, &namespace) => {
                    problems.push(Problem::warning(
                        pin.location.clone(),
                        format!("`{}` has unresolved @param type for {}", pin.path, param.name),
                    ))
                }
                Some(_) => {}
            }
        }
    }

    /// Tags contradicted by inference, mistyped arguments and unresolved
    /// calls.
    pub fn strict_type_problems(&self) -> Vec<Problem> {
        let Some(map) = self.parsed_map() else {
            return Vec::new();
        };
        let probe = Probe::new(&self.api_map);
        let mut problems = Vec::new();
        for pin in map.method_pins().filter(|pin| !pin.is_attribute()) {
            if let Some(problem) = self.confirm_return_type(&probe, pin) {
                problems.push(problem);
            }
        }
        if let Some(tree) = map.tree() {
            problems.extend(calls::CallChecker::new(&probe, map).check(tree));
        }
        sort(&mut problems);
        debug!(filename = %self.filename, problems = problems.len(), "strict check finished");
        problems
    }

    fn confirm_return_type(&self, probe: &Probe<'_>, pin: &Arc<Pin>) -> Option<Problem> {
        let (tag, namespace) = self.api_map.return_tag(pin)?;
        if tag.is_void() || !self.api_map.resolvable(&tag, &namespace) {
            return None;
        }
        let tag = self
            .api_map
            .qualify_type(&tag.self_to(&probe.self_type(&pin.inner_closure())), &namespace);
        let inferred = probe.infer_method_return(pin);
        if inferred.is_undefined() || self.api_map.compatible(&tag, &inferred, &namespace) {
            return None;
        }
        Some(Problem::error(
            pin.location.clone(),
            format!(
                "`{}` @return type `{}` does not match inferred type `{}`",
                pin.path, tag, inferred
            ),
        ))
    }

    /// The source map of a file that parsed without errors.
    fn parsed_map(&self) -> Option<&Arc<SourceMap>> {
        self.api_map
            .source_map(&self.filename)
            .filter(|map| map.source().is_parsed())
    }
}

fn sort(problems: &mut [Problem]) {
    problems.sort_by(|a, b| location_key(&a.location).cmp(&location_key(&b.location)));
}

fn location_key(location: &Location) -> (&str, ruby_syntax::Position) {
    (location.filename.as_str(), location.range.start)
}
