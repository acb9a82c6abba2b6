//! Helper descriptors and the closed set of helper kinds.

use serde::Serialize;

use crate::{
    chain::{BuilderApply, BuilderArgs, FnBuilder},
    extension::Extension,
    fragment::{FnFragment, FragmentApply, FragmentArgs},
    host::Host,
};

/// Which registration surface a helper belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperKind {
    Fragment,
    Builder,
    Extension,
}

impl std::fmt::Display for HelperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HelperKind::Fragment => write!(f, "fragment"),
            HelperKind::Builder => write!(f, "builder"),
            HelperKind::Extension => write!(f, "extension"),
        }
    }
}

/// How a helper claims its key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperMode {
    /// Any number of helpers may share the key.
    #[default]
    Extend,
    /// At most one override helper may claim the key per surface.
    Override,
}

impl std::fmt::Display for HelperMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HelperMode::Extend => write!(f, "extend"),
            HelperMode::Override => write!(f, "override"),
        }
    }
}

/// Registration metadata shared by every helper kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperDescriptor {
    pub key: String,
    pub kind: HelperKind,
    pub mode: HelperMode,
    /// Higher runs earlier in the builder chain.
    pub priority: i32,
    /// Keys this helper must run after. Ordered and free of duplicates.
    pub depends_on: Vec<String>,
    /// Who contributed the helper; reported in conflict diagnostics.
    pub origin: Option<String>,
}

impl HelperDescriptor {
    pub fn new(key: impl Into<String>, kind: HelperKind) -> Self {
        Self {
            key: key.into(),
            kind,
            mode: HelperMode::Extend,
            priority: 0,
            depends_on: Vec::new(),
            origin: None,
        }
    }

    /// The origin, falling back to the key.
    pub fn origin_or_key(&self) -> &str {
        self.origin.as_deref().unwrap_or(&self.key)
    }

    fn push_dependencies<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            let key = key.into();
            if !self.depends_on.contains(&key) {
                self.depends_on.push(key);
            }
        }
    }
}

/// Implements the descriptor builder methods shared by fragment and builder
/// helpers.
macro_rules! descriptor_setters {
    () => {
        /// Set the registration mode.
        pub fn mode(mut self, mode: HelperMode) -> Self {
            self.descriptor.mode = mode;
            self
        }

        /// Shorthand for `mode(HelperMode::Override)`.
        pub fn overriding(self) -> Self {
            self.mode(HelperMode::Override)
        }

        pub fn priority(mut self, priority: i32) -> Self {
            self.descriptor.priority = priority;
            self
        }

        /// Add keys this helper must run after. Duplicates are dropped.
        pub fn depends_on<I, S>(mut self, keys: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.descriptor.push_dependencies(keys);
            self
        }

        pub fn origin(mut self, origin: impl Into<String>) -> Self {
            self.descriptor.origin = Some(origin.into());
            self
        }

        pub fn descriptor(&self) -> &HelperDescriptor {
            &self.descriptor
        }

        pub fn key(&self) -> &str {
            &self.descriptor.key
        }
    };
}

/// A helper contributing fields to the draft.
pub struct FragmentHelper<H: Host> {
    pub(crate) descriptor: HelperDescriptor,
    pub(crate) apply: Box<dyn FragmentApply<H>>,
}

impl<H: Host> FragmentHelper<H> {
    pub fn new(key: impl Into<String>, apply: impl FragmentApply<H> + 'static) -> Self {
        Self {
            descriptor: HelperDescriptor::new(key, HelperKind::Fragment),
            apply: Box::new(apply),
        }
    }

    /// Adapt a synchronous closure into a fragment.
    pub fn from_fn<F>(key: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(FragmentArgs<'a, H>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        Self::new(key, FnFragment::new(f))
    }

    descriptor_setters!();
}

/// A helper acting on the artifact as a link of the builder chain.
pub struct BuilderHelper<H: Host> {
    pub(crate) descriptor: HelperDescriptor,
    pub(crate) apply: Box<dyn BuilderApply<H>>,
}

impl<H: Host> BuilderHelper<H> {
    pub fn new(key: impl Into<String>, apply: impl BuilderApply<H> + 'static) -> Self {
        Self {
            descriptor: HelperDescriptor::new(key, HelperKind::Builder),
            apply: Box::new(apply),
        }
    }

    /// Adapt a synchronous closure into a builder.
    ///
    /// The adapted builder always continues the chain after the closure
    /// returns successfully.
    pub fn from_fn<F>(key: impl Into<String>, f: F) -> Self
    where
        F: for<'a, 'b> Fn(&'b mut BuilderArgs<'a, H>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        Self::new(key, FnBuilder::new(f))
    }

    descriptor_setters!();
}

/// A helper wrapping the artifact phase with commit and rollback.
pub struct ExtensionHelper<H: Host> {
    pub(crate) descriptor: HelperDescriptor,
    pub(crate) extension: Box<dyn Extension<H>>,
}

impl<H: Host> ExtensionHelper<H> {
    pub fn new(extension: impl Extension<H> + 'static) -> Self {
        let key = extension.key().unwrap_or_default().to_string();
        Self {
            descriptor: HelperDescriptor::new(key, HelperKind::Extension),
            extension: Box::new(extension),
        }
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.descriptor.origin = Some(origin.into());
        self
    }

    pub fn descriptor(&self) -> &HelperDescriptor {
        &self.descriptor
    }
}

/// Any helper, dispatched to its surface by [`Pipeline::use_helper`](crate::Pipeline::use_helper).
pub enum Helper<H: Host> {
    Fragment(FragmentHelper<H>),
    Builder(BuilderHelper<H>),
    Extension(ExtensionHelper<H>),
}

impl<H: Host> Helper<H> {
    pub fn kind(&self) -> HelperKind {
        match self {
            Helper::Fragment(_) => HelperKind::Fragment,
            Helper::Builder(_) => HelperKind::Builder,
            Helper::Extension(_) => HelperKind::Extension,
        }
    }

    pub fn descriptor(&self) -> &HelperDescriptor {
        match self {
            Helper::Fragment(helper) => &helper.descriptor,
            Helper::Builder(helper) => &helper.descriptor,
            Helper::Extension(helper) => &helper.descriptor,
        }
    }
}

impl<H: Host> From<FragmentHelper<H>> for Helper<H> {
    fn from(helper: FragmentHelper<H>) -> Self {
        Helper::Fragment(helper)
    }
}

impl<H: Host> From<BuilderHelper<H>> for Helper<H> {
    fn from(helper: BuilderHelper<H>) -> Self {
        Helper::Builder(helper)
    }
}

impl<H: Host> From<ExtensionHelper<H>> for Helper<H> {
    fn from(helper: ExtensionHelper<H>) -> Self {
        Helper::Extension(helper)
    }
}

/// Access to a helper's descriptor inside the registry.
pub(crate) trait Described {
    fn descriptor(&self) -> &HelperDescriptor;
}

impl<H: Host> Described for FragmentHelper<H> {
    fn descriptor(&self) -> &HelperDescriptor {
        &self.descriptor
    }
}

impl<H: Host> Described for BuilderHelper<H> {
    fn descriptor(&self) -> &HelperDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depends_on_deduplicates() {
        let mut descriptor = HelperDescriptor::new("ir.validation", HelperKind::Fragment);
        descriptor.push_dependencies(["ir.meta", "ir.collection", "ir.meta"]);
        assert_eq!(descriptor.depends_on, vec!["ir.meta", "ir.collection"]);
    }

    #[test]
    fn test_origin_falls_back_to_key() {
        let mut descriptor = HelperDescriptor::new("builder.php", HelperKind::Builder);
        assert_eq!(descriptor.origin_or_key(), "builder.php");
        descriptor.origin = Some("php-plugin".into());
        assert_eq!(descriptor.origin_or_key(), "php-plugin");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(HelperKind::Fragment.to_string(), "fragment");
        assert_eq!(HelperKind::Builder.to_string(), "builder");
        assert_eq!(HelperKind::Extension.to_string(), "extension");
    }
}
