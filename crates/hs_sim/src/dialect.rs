/// Identifier of one of the six scripting dialects.
///
/// Lives in the simulation crate because the player's language
/// proficiency table and the adversarial resolver (proficiency theft)
/// are keyed by it, not just the front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DialectId {
    NovaSec,
    NetScript,
    ShellScript,
    CppSharp,
    MarkScript,
    Texting2Exiting,
}

impl DialectId {
    pub const ALL: [DialectId; 6] = [
        DialectId::NovaSec,
        DialectId::NetScript,
        DialectId::ShellScript,
        DialectId::CppSharp,
        DialectId::MarkScript,
        DialectId::Texting2Exiting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DialectId::NovaSec => "novasec",
            DialectId::NetScript => "netscript",
            DialectId::ShellScript => "shellscript",
            DialectId::CppSharp => "cppsharp",
            DialectId::MarkScript => "markscript",
            DialectId::Texting2Exiting => "texting2exiting",
        }
    }

    /// Specialization unlocked once proficiency in this dialect
    /// reaches the unlock threshold.
    pub fn specialization(self) -> &'static str {
        match self {
            DialectId::NovaSec => "rapid_prototyping",
            DialectId::NetScript => "protocol_weaving",
            DialectId::ShellScript => "pipeline_mastery",
            DialectId::CppSharp => "memory_discipline",
            DialectId::MarkScript => "literate_intrusion",
            DialectId::Texting2Exiting => "bare_metal",
        }
    }

    pub fn parse(name: &str) -> Option<DialectId> {
        match name.to_ascii_lowercase().as_str() {
            "novasec" => Some(DialectId::NovaSec),
            "netscript" => Some(DialectId::NetScript),
            "shellscript" | "shell" => Some(DialectId::ShellScript),
            "cppsharp" => Some(DialectId::CppSharp),
            "markscript" => Some(DialectId::MarkScript),
            "texting2exiting" | "t2e" | "asm" => Some(DialectId::Texting2Exiting),
            _ => None,
        }
    }
}

impl std::fmt::Display for DialectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for id in DialectId::ALL {
            assert_eq!(DialectId::parse(id.name()), Some(id));
        }
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(DialectId::parse("asm"), Some(DialectId::Texting2Exiting));
        assert_eq!(DialectId::parse("shell"), Some(DialectId::ShellScript));
        assert_eq!(DialectId::parse("NOVASEC"), Some(DialectId::NovaSec));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(DialectId::parse("cobol"), None);
    }
}
