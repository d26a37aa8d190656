use serde_json::{Value, json};

use crate::llm::Instructions;
use crate::settings::{GenerationSettings, Language};

const SERVICE_NAME_TOKEN: &str = "[serviceName]";

/// Package policy for generated server code. The service name is left to
/// the model; only the shape of each path is fixed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    base: String,
}

impl PackageLayout {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn complex_root(&self) -> String {
        format!("{}.resource.complex.{SERVICE_NAME_TOKEN}", self.base)
    }

    pub fn controller(&self) -> String {
        format!("{}.controller", self.complex_root())
    }

    pub fn service(&self) -> String {
        format!("{}.service", self.complex_root())
    }

    pub fn model(&self) -> String {
        format!("{}.{SERVICE_NAME_TOKEN}.model", self.complex_root())
    }
}

fn language_instruction(language: Language) -> &'static str {
    match language {
        Language::Korean => "All explanations and comments must be in Korean.",
        Language::English => "All explanations and comments must be in English.",
    }
}

fn comment_instruction(include_comments: bool) -> &'static str {
    if include_comments {
        "Include detailed JSDoc/JavaDoc comments for all functions and XML comments for complex layout structures."
    } else {
        "Keep comments minimal and focused on complex logic only."
    }
}

const JSON_CONTRACT: &str = r#"
You MUST return the result strictly as a single valid JSON object with exactly these fields:

{
  "clxCode": string,      // XML content of the eXbuilder6 .clx file
  "jsCode": string,       // JavaScript content of the eXbuilder6 .js controller
  "javaFiles": [          // Java server files
    {
      "fileName": string,     // e.g. "UserService.java"
      "packagePath": string,  // e.g. "com.example.resource.complex.user.service"
      "content": string,      // full Java file content
      "type": "controller" | "service" | "model"
    }
  ],
  "logs": string[],       // build steps, one line each
  "explanation": string,  // summary of what was generated
  "previewMock": string   // simple HTML mock of the component, inline styles only
}

Do not wrap the response in markdown code fences (such as ```json). Return only the raw JSON text."#;

pub fn system_instruction(settings: &GenerationSettings) -> String {
    let layout = PackageLayout::new(settings.namespace());

    format!(
        "You are an expert eXbuilder6 UI and Spring Boot Java developer.\n\
        {language}\n\
        {comments}\n\n\
        Tasks:\n\
        1. Generate valid eXbuilder6 .clx XML.\n\
        2. Generate the corresponding .js controller logic.\n\
        3. Generate Java Spring Boot server code (Controller, Service, Model).\n\n\
        Java Package Rules:\n\
        - Base Package: {base}\n\
        - Controller: {controller}\n\
        - Service: {service}\n\
        - Model: {model}\n\
        Choose a short lowercase {token} that describes the component.\n\n\
        Always generate valid, compilable code.",
        language = language_instruction(settings.language),
        comments = comment_instruction(settings.include_comments),
        base = layout.base(),
        controller = layout.controller(),
        service = layout.service(),
        model = layout.model(),
        token = SERVICE_NAME_TOKEN,
    )
}

pub fn user_instruction(prompt: &str) -> String {
    format!(
        "Generate eXbuilder6 and Java Spring Boot code for: {}\n\
        Provide:\n\
        1. CLX (XML)\n\
        2. JS Controller\n\
        3. List of Java files (Controller, Model, Service) with their full package paths and content.\n\
        4. Logs and explanation.",
        prompt.trim()
    )
}

/// Schema handed to backends with structured-output support.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "clxCode": {
                "type": "STRING",
                "description": "The XML content for the eXbuilder6 .clx file."
            },
            "jsCode": {
                "type": "STRING",
                "description": "The JavaScript content for the eXbuilder6 .js file."
            },
            "javaFiles": {
                "type": "ARRAY",
                "description": "List of Java server files generated.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "fileName": { "type": "STRING", "description": "FileName.java" },
                        "packagePath": { "type": "STRING", "description": "Full package path (e.g. com.example...)" },
                        "content": { "type": "STRING", "description": "Full Java file content" },
                        "type": { "type": "STRING", "enum": ["controller", "service", "model"] }
                    },
                    "required": ["fileName", "packagePath", "content", "type"]
                }
            },
            "logs": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of logs detailing the build process."
            },
            "explanation": {
                "type": "STRING",
                "description": "A summary of what was generated."
            },
            "previewMock": {
                "type": "STRING",
                "description": "An HTML string that represents a visual mock of the UI component."
            }
        },
        "required": ["clxCode", "jsCode", "javaFiles", "logs", "explanation"]
    })
}

/// Builds the instructions for one call. Never fails; missing settings
/// were already replaced by their defaults.
pub fn build(prompt: &str, settings: &GenerationSettings) -> Instructions {
    let mut system = system_instruction(settings);

    let response_schema = if settings.provider.supports_native_schema() {
        Some(response_schema())
    } else {
        system.push_str("\n\n");
        system.push_str(JSON_CONTRACT.trim_start());
        None
    };

    Instructions {
        system,
        user: user_instruction(prompt),
        response_schema,
    }
}
