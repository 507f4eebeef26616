//! Static engine profiles.
//!
//! Each simulator's quirks are plain data in [`PROFILES`]. The adapter never
//! branches on an engine name; it only reads the profile.

use std::borrow::Cow;

use hdlrun_common::{HdlLanguage, WaveformFormat};

use crate::error::EngineError;

/// How an engine's trace file is named or requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveformRule {
    /// The engine writes into the build directory under a name rendered from
    /// this template (`{toplevel}` and `{format}` are substituted).
    BuildDir(&'static str),
    /// The engine writes wherever a plusarg tells it to. The plusarg is
    /// rendered from this template (`{format}` and `{path}` are substituted)
    /// with the absolute destination path, so no copy is needed afterwards.
    Plusarg(&'static str),
}

/// Case normalization applied to the toplevel name before it reaches the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToplevelCase {
    /// Leave the name unchanged.
    Preserve,
    /// Lower-case the name (VHDL engines look entities up case-folded).
    Lower,
}

impl ToplevelCase {
    /// Applies the rule to `name`.
    pub fn apply(self, name: &str) -> String {
        match self {
            ToplevelCase::Preserve => name.to_string(),
            ToplevelCase::Lower => name.to_lowercase(),
        }
    }
}

/// A tracing flag added when waveforms are requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceFlag {
    /// The flag text.
    pub flag: &'static str,
    /// Restricts the flag to one waveform format.
    pub only_for: Option<WaveformFormat>,
}

/// A waveform format the engine accepts but cannot produce directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Degradation {
    /// The affected format.
    pub format: WaveformFormat,
    /// Plusargs passed to the test step instead of enabling tracing.
    pub plusargs: &'static [&'static str],
}

/// Everything hdlrun knows about one simulation engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineProfile {
    /// The engine name used in requests.
    pub name: Cow<'static, str>,
    /// Languages the engine accepts, in preference order.
    pub languages: &'static [HdlLanguage],
    /// Flags keeping the engine lenient about legacy constructs.
    pub compat_flags: &'static [&'static str],
    /// The language-standard flag, if the engine needs one.
    pub standard_flag: Option<&'static str>,
    /// Whether the standard flag is repeated on the test step.
    pub standard_in_test: bool,
    /// Further build flags, appended after the standard flag.
    pub build_flags: &'static [&'static str],
    /// Plusargs always passed to the test step.
    pub plusargs: &'static [&'static str],
    /// Flags added to the build when tracing.
    pub trace_flags: &'static [TraceFlag],
    /// Whether the trace flags are mirrored into the test arguments.
    pub trace_in_test: bool,
    /// How the trace file is located.
    pub waveform: WaveformRule,
    /// Accepted waveform formats.
    pub formats: &'static [WaveformFormat],
    /// A format accepted only in degraded form.
    pub degraded: Option<Degradation>,
    /// Toplevel normalization.
    pub toplevel_case: ToplevelCase,
}

const BOTH_FORMATS: &[WaveformFormat] = &[WaveformFormat::Vcd, WaveformFormat::Fst];

/// The built-in engines.
pub static PROFILES: [EngineProfile; 4] = [
    EngineProfile {
        name: Cow::Borrowed("icarus"),
        languages: &[HdlLanguage::Verilog],
        compat_flags: &["-g2005"],
        standard_flag: None,
        standard_in_test: false,
        build_flags: &[],
        plusargs: &[],
        trace_flags: &[],
        trace_in_test: false,
        waveform: WaveformRule::BuildDir("{toplevel}.fst"),
        formats: BOTH_FORMATS,
        degraded: Some(Degradation {
            format: WaveformFormat::Vcd,
            plusargs: &["-vcd"],
        }),
        toplevel_case: ToplevelCase::Preserve,
    },
    EngineProfile {
        name: Cow::Borrowed("verilator"),
        languages: &[HdlLanguage::Verilog],
        compat_flags: &["--Wno-fatal"],
        standard_flag: None,
        standard_in_test: false,
        build_flags: &[],
        plusargs: &[],
        trace_flags: &[
            TraceFlag {
                flag: "--trace-structs",
                only_for: None,
            },
            TraceFlag {
                flag: "--trace-fst",
                only_for: Some(WaveformFormat::Fst),
            },
        ],
        trace_in_test: true,
        waveform: WaveformRule::BuildDir("dump.{format}"),
        formats: BOTH_FORMATS,
        degraded: None,
        toplevel_case: ToplevelCase::Preserve,
    },
    EngineProfile {
        name: Cow::Borrowed("ghdl"),
        languages: &[HdlLanguage::Vhdl],
        compat_flags: &[],
        standard_flag: Some("--std=08"),
        standard_in_test: true,
        build_flags: &[],
        plusargs: &[],
        trace_flags: &[],
        trace_in_test: false,
        waveform: WaveformRule::Plusarg("--{format}={path}"),
        formats: BOTH_FORMATS,
        degraded: None,
        toplevel_case: ToplevelCase::Lower,
    },
    EngineProfile {
        name: Cow::Borrowed("nvc"),
        languages: &[HdlLanguage::Vhdl],
        compat_flags: &[],
        standard_flag: Some("--std=2008"),
        standard_in_test: false,
        build_flags: &["-M", "256m"],
        plusargs: &["--dump-arrays"],
        trace_flags: &[],
        trace_in_test: false,
        waveform: WaveformRule::Plusarg("--wave={path}"),
        formats: &[WaveformFormat::Fst],
        degraded: None,
        toplevel_case: ToplevelCase::Lower,
    },
];

/// Returns the built-in profile named `name`.
pub fn lookup_profile(name: &str) -> Option<&'static EngineProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

impl EngineProfile {
    /// A quirk-free profile for an engine hdlrun has no table entry for.
    pub fn generic(name: &str) -> Self {
        Self {
            name: Cow::Owned(name.to_string()),
            languages: &HdlLanguage::ALL,
            compat_flags: &[],
            standard_flag: None,
            standard_in_test: false,
            build_flags: &[],
            plusargs: &[],
            trace_flags: &[],
            trace_in_test: false,
            waveform: WaveformRule::BuildDir("{toplevel}.{format}"),
            formats: BOTH_FORMATS,
            degraded: None,
            toplevel_case: ToplevelCase::Preserve,
        }
    }

    /// Returns the profile for `name` and whether it is a built-in one.
    pub fn resolve(name: &str) -> (Self, bool) {
        match lookup_profile(name) {
            Some(profile) => (profile.clone(), true),
            None => (Self::generic(name), false),
        }
    }

    /// Returns true if the engine accepts sources in `lang`.
    pub fn supports(&self, lang: HdlLanguage) -> bool {
        self.languages.contains(&lang)
    }

    /// Narrows the engine's languages to an explicitly requested one.
    pub fn check_language(&self, lang: HdlLanguage) -> Result<(), EngineError> {
        if self.supports(lang) {
            Ok(())
        } else {
            Err(EngineError::UnsupportedCapability(format!(
                "simulator '{}' does not support {lang}",
                self.name
            )))
        }
    }

    /// Checks that the engine can produce `format`.
    ///
    /// Returns `true` when the format is accepted only in degraded form.
    pub fn check_waveform(&self, format: WaveformFormat) -> Result<bool, EngineError> {
        if !self.formats.contains(&format) {
            let accepted: Vec<_> = self.formats.iter().map(|f| format!(".{f}")).collect();
            return Err(EngineError::UnsupportedCapability(format!(
                "{} doesn't support .{format} waveform, only {}",
                self.name,
                accepted.join(", ")
            )));
        }
        Ok(self.degraded.is_some_and(|d| d.format == format))
    }

    /// Normalizes a toplevel name for this engine.
    pub fn normalize_toplevel(&self, name: &str) -> String {
        self.toplevel_case.apply(name)
    }

    /// Trace flags that apply to `format`, in declaration order.
    pub fn trace_flags_for(&self, format: WaveformFormat) -> impl Iterator<Item = &'static str> + '_ {
        self.trace_flags
            .iter()
            .filter(move |t| t.only_for.map_or(true, |f| f == format))
            .map(|t| t.flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_found() {
        for name in ["icarus", "verilator", "ghdl", "nvc"] {
            assert_eq!(lookup_profile(name).unwrap().name, name);
        }
        assert!(lookup_profile("xcelium").is_none());
    }

    #[test]
    fn languages() {
        assert!(lookup_profile("icarus").unwrap().supports(HdlLanguage::Verilog));
        assert!(!lookup_profile("icarus").unwrap().supports(HdlLanguage::Vhdl));
        assert!(lookup_profile("nvc").unwrap().supports(HdlLanguage::Vhdl));
        let err = lookup_profile("ghdl")
            .unwrap()
            .check_language(HdlLanguage::Verilog)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedCapability(_)));
    }

    #[test]
    fn generic_accepts_everything() {
        let (profile, known) = EngineProfile::resolve("questa");
        assert!(!known);
        assert_eq!(profile.name, "questa");
        assert_eq!(profile.languages, HdlLanguage::ALL);
        assert!(!profile.check_waveform(WaveformFormat::Vcd).unwrap());
        assert_eq!(profile.waveform, WaveformRule::BuildDir("{toplevel}.{format}"));
    }

    #[test]
    fn nvc_rejects_vcd() {
        let nvc = lookup_profile("nvc").unwrap();
        let err = nvc.check_waveform(WaveformFormat::Vcd).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported capability: nvc doesn't support .vcd waveform, only .fst"
        );
        assert!(!nvc.check_waveform(WaveformFormat::Fst).unwrap());
    }

    #[test]
    fn icarus_vcd_is_degraded() {
        let icarus = lookup_profile("icarus").unwrap();
        assert!(icarus.check_waveform(WaveformFormat::Vcd).unwrap());
        assert!(!icarus.check_waveform(WaveformFormat::Fst).unwrap());
    }

    #[test]
    fn vhdl_engines_lowercase_toplevel() {
        assert_eq!(lookup_profile("ghdl").unwrap().normalize_toplevel("Top_Adder"), "top_adder");
        assert_eq!(lookup_profile("icarus").unwrap().normalize_toplevel("Top_Adder"), "Top_Adder");
    }

    #[test]
    fn verilator_trace_flags_by_format() {
        let v = lookup_profile("verilator").unwrap();
        let vcd: Vec<_> = v.trace_flags_for(WaveformFormat::Vcd).collect();
        let fst: Vec<_> = v.trace_flags_for(WaveformFormat::Fst).collect();
        assert_eq!(vcd, ["--trace-structs"]);
        assert_eq!(fst, ["--trace-structs", "--trace-fst"]);
    }
}
