//! The language registry: a closed set of supported languages and the fixed
//! execution profile for each. Adding a language means adding a variant and
//! an arm here; the pipeline never changes.

/// How to build and run one supported language inside its sandbox image.
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    pub image: &'static str,
    pub src_name: &'static str,
    pub compile_cmd: Option<&'static str>,
    pub run_cmd: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
    C,
    Cpp,
    Java,
}

impl Language {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::JavaScript),
            "c" => Some(Language::C),
            "cpp" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    pub fn needs_compile(self) -> bool {
        self.profile().compile_cmd.is_some()
    }

    pub fn profile(self) -> LanguageProfile {
        match self {
            Language::Python => LanguageProfile {
                image: "python:3.9-slim",
                src_name: "solution.py",
                compile_cmd: None,
                run_cmd: "python solution.py",
            },
            Language::JavaScript => LanguageProfile {
                image: "node:18-alpine",
                src_name: "solution.js",
                compile_cmd: None,
                run_cmd: "node solution.js",
            },
            Language::C => LanguageProfile {
                image: "gcc:12",
                src_name: "solution.c",
                compile_cmd: Some("gcc solution.c -o solution"),
                run_cmd: "./solution",
            },
            Language::Cpp => LanguageProfile {
                image: "gcc:12",
                src_name: "solution.cpp",
                compile_cmd: Some("g++ solution.cpp -o solution"),
                run_cmd: "./solution",
            },
            // The JVM requires the file name to match the public class, so
            // every submission is materialized as Solution.java.
            Language::Java => LanguageProfile {
                image: "openjdk:17-jdk-alpine",
                src_name: "Solution.java",
                compile_cmd: Some("javac Solution.java"),
                run_cmd: "java Solution",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve_and_roundtrip() {
        for id in ["python", "javascript", "c", "cpp", "java"] {
            let lang = Language::from_id(id).unwrap();
            assert_eq!(lang.id(), id);
        }
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        assert!(Language::from_id("cobol").is_none());
        assert!(Language::from_id("").is_none());
        assert!(Language::from_id("Python").is_none());
    }

    #[test]
    fn interpreted_profiles_have_no_compile_step() {
        assert!(!Language::Python.needs_compile());
        assert!(!Language::JavaScript.needs_compile());
        assert!(Language::C.needs_compile());
        assert!(Language::Cpp.needs_compile());
        assert!(Language::Java.needs_compile());
    }

    #[test]
    fn java_source_name_is_fixed_by_class_name() {
        assert_eq!(Language::Java.profile().src_name, "Solution.java");
    }

    #[test]
    fn compile_commands_reference_the_materialized_source() {
        for lang in [Language::C, Language::Cpp, Language::Java] {
            let profile = lang.profile();
            let compile = profile.compile_cmd.unwrap();
            assert!(compile.contains(profile.src_name));
        }
    }
}
