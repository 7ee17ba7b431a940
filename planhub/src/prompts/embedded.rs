//! Embedded fallback manifest
//!
//! Compiled into the binary and used transparently whenever the remote
//! manifest cannot be fetched. Keep in sync with the deployed manifest when
//! template schemas change.

/// Fallback copy of the template manifest
pub const MANIFEST: &str = r#"{
  "templates": {
    "clo_v3": {
      "version": "3.1.0",
      "storage_path": "templates/clo_v3.txt",
      "variables": [
        { "name": "TRACK_LABEL", "kind": "string", "min": 1, "max": 64 },
        { "name": "TIME_PER_WEEK", "kind": "number", "min": 1, "max": 60 },
        {
          "name": "LEVEL",
          "kind": "enum",
          "required": false,
          "allowed": ["beginner", "intermediate", "advanced"]
        }
      ]
    },
    "ta_v2": {
      "version": "2.4.0",
      "storage_path": "templates/ta_v2.txt",
      "variables": [
        { "name": "TOPIC", "kind": "string", "min": 1, "max": 80 },
        { "name": "STRUGGLES", "kind": "array", "required": false, "max": 10 }
      ]
    },
    "session_brief_v1": {
      "version": "1.0.2",
      "storage_path": "templates/session_brief_v1.txt",
      "variables": [
        { "name": "TOPIC", "kind": "string", "min": 1, "max": 80 },
        { "name": "WEEK", "kind": "number", "required": false, "min": 1, "max": 52 },
        { "name": "FOCUS_AREAS", "kind": "array", "required": false, "max": 5 }
      ]
    }
  }
}"#;
