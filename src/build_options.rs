use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Toggleable compiler options recognized by the program builder.
    ///
    /// Each flag maps to one option token; see [`BuildOptions`] for the
    /// rendered string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BuildFlags: u16 {
        /// `-w`, silence all compiler warnings.
        const WARNINGS = 1 << 0;
        /// `-cl-single-precision-constant`.
        const SINGLE_PRECISION_CONSTANT = 1 << 1;
        /// `-cl-mad-enable`.
        const MAD_ENABLE = 1 << 2;
        /// `-cl-no-signed-zeros`.
        const NO_SIGNED_ZEROS = 1 << 3;
        /// `-cl-fast-relaxed-math`.
        const FAST_RELAXED_MATH = 1 << 4;
        /// `-cl-unsafe-math-optimizations`.
        const UNSAFE_MATH_OPTIMIZATIONS = 1 << 5;
        /// `-cl-nv-verbose`, NVIDIA's verbose build diagnostics.
        const NV_VERBOSE = 1 << 6;
    }
}

/// OpenCL C dialect selector, rendered as `-cl-std=<version>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageVersion {
    Cl1_1,
    Cl1_2,
    Cl2_0,
    Cl3_0,
}

impl LanguageVersion {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cl1_1 => "CL1.1",
            Self::Cl1_2 => "CL1.2",
            Self::Cl2_0 => "CL2.0",
            Self::Cl3_0 => "CL3.0",
        }
    }
}

/// Compiler options for [`Device::add_program_with_options`].
///
/// Rendered tokens are emitted in a fixed order so identical option sets
/// always produce identical option strings.
///
/// [`Device::add_program_with_options`]: crate::Device::add_program_with_options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub flags: BuildFlags,
    pub version: Option<LanguageVersion>,
}

impl BuildOptions {
    pub fn new(flags: BuildFlags) -> Self {
        Self {
            flags,
            version: None,
        }
    }

    pub fn with_version(mut self, version: LanguageVersion) -> Self {
        self.version = Some(version);
        self
    }
}

impl fmt::Display for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<String> = Vec::new();
        if self.flags.contains(BuildFlags::WARNINGS) {
            tokens.push("-w".to_string());
        }
        if let Some(version) = self.version {
            tokens.push(format!("-cl-std={}", version.as_str()));
        }
        if self.flags.contains(BuildFlags::SINGLE_PRECISION_CONSTANT) {
            tokens.push("-cl-single-precision-constant".to_string());
        }
        if self.flags.contains(BuildFlags::MAD_ENABLE) {
            tokens.push("-cl-mad-enable".to_string());
        }
        if self.flags.contains(BuildFlags::NO_SIGNED_ZEROS) {
            tokens.push("-cl-no-signed-zeros".to_string());
        }
        if self.flags.contains(BuildFlags::FAST_RELAXED_MATH) {
            tokens.push("-cl-fast-relaxed-math".to_string());
        }
        if self.flags.contains(BuildFlags::UNSAFE_MATH_OPTIMIZATIONS) {
            tokens.push("-cl-unsafe-math-optimizations".to_string());
        }
        if self.flags.contains(BuildFlags::NV_VERBOSE) {
            tokens.push("-cl-nv-verbose".to_string());
        }
        write!(f, "{}", tokens.join(" "))
    }
}
