//! Document corpus: the built-in knowledge base and markdown loading

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::path::Path;
use tracing::{debug, warn};

use qr_core::{Document, Error, Result};

const BUILTIN: &[(&str, &str, &str, &str, &str)] = &[
    (
        "python_intro",
        "Python Programming Basics",
        "Python is a high-level, interpreted programming language created by Guido van Rossum \
         and first released in 1991. It emphasizes code readability with significant indentation. \
         Python supports multiple programming paradigms including procedural, object-oriented, \
         and functional programming.",
        "python_basics.md",
        "programming",
    ),
    (
        "python_uses",
        "Python Applications",
        "Python is widely used in various domains: web development (Django, Flask), data science \
         (pandas, NumPy), machine learning (TensorFlow, PyTorch, scikit-learn), automation and \
         scripting, scientific computing, game development, and desktop applications. Its extensive \
         standard library and third-party packages make it versatile for almost any task.",
        "python_basics.md",
        "programming",
    ),
    (
        "ml_intro",
        "Machine Learning Introduction",
        "Machine learning is a subset of artificial intelligence that enables systems to learn \
         and improve from experience without being explicitly programmed. It focuses on developing \
         algorithms that can access data and use it to learn for themselves. Common types include \
         supervised learning, unsupervised learning, and reinforcement learning.",
        "ml_intro.md",
        "ai",
    ),
    (
        "ml_algorithms",
        "Common ML Algorithms",
        "Popular machine learning algorithms include: Linear Regression for prediction, \
         Decision Trees for classification, Random Forests for ensemble learning, \
         Support Vector Machines (SVM) for classification, K-Means for clustering, \
         and Neural Networks for deep learning. Each algorithm has specific use cases \
         and performance characteristics.",
        "ml_intro.md",
        "ai",
    ),
    (
        "deep_learning",
        "Deep Learning Overview",
        "Deep learning uses artificial neural networks with multiple layers (deep networks) \
         to progressively extract higher-level features from raw input. Popular frameworks \
         include TensorFlow, PyTorch, and Keras. Applications include computer vision \
         (image classification, object detection), natural language processing (chatbots, \
         translation), speech recognition, and game playing (AlphaGo).",
        "ml_intro.md",
        "ai",
    ),
    (
        "docker_intro",
        "Docker Containerization",
        "Docker is a platform for developing, shipping, and running applications in containers. \
         Containers package software with all its dependencies, ensuring consistency across \
         different environments. Docker uses OS-level virtualization to deliver software in \
         packages called containers, which are isolated from one another and bundle their \
         own software, libraries, and configuration files.",
        "devops.md",
        "infrastructure",
    ),
    (
        "docker_benefits",
        "Benefits of Docker",
        "Key benefits of Docker include: Portability (run anywhere), Consistency (same environment \
         in dev/staging/prod), Isolation (containers don't interfere with each other), \
         Efficiency (lightweight compared to VMs), Scalability (easy to scale up/down), \
         Version control (track container images), and Rapid deployment (start containers \
         in seconds).",
        "devops.md",
        "infrastructure",
    ),
    (
        "kubernetes_intro",
        "Kubernetes Orchestration",
        "Kubernetes (K8s) is an open-source container orchestration platform that automates \
         deployment, scaling, and management of containerized applications. It groups containers \
         into logical units for easy management and discovery. Key concepts include Pods \
         (smallest deployable units), Services (network access), Deployments (desired state), \
         and Namespaces (virtual clusters).",
        "devops.md",
        "infrastructure",
    ),
    (
        "git_basics",
        "Git Version Control",
        "Git is a distributed version control system for tracking changes in source code during \
         software development. It allows multiple developers to work together on non-linear \
         development. Key concepts include: repositories (project storage), commits (snapshots), \
         branches (parallel development), merging (combining changes), and remote repositories \
         (GitHub, GitLab).",
        "git_guide.md",
        "tools",
    ),
    (
        "rest_api",
        "REST API Design",
        "REST (Representational State Transfer) is an architectural style for designing networked \
         applications. RESTful APIs use HTTP methods: GET (retrieve), POST (create), PUT (update), \
         DELETE (remove). Key principles include statelessness, client-server separation, \
         cacheability, uniform interface, and layered system. Common formats are JSON and XML.",
        "api_design.md",
        "web",
    ),
];

/// The knowledge base shipped with the router
pub fn builtin_documents() -> Vec<Document> {
    BUILTIN
        .iter()
        .map(|(id, title, content, origin, category)| Document {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            origin: origin.to_string(),
            category: category.to_string(),
        })
        .collect()
}

/// Convert markdown into a document. The first heading is the title;
/// without one the fallback title is used.
pub fn parse_markdown(id: &str, fallback_title: &str, origin: &str, markdown: &str) -> Document {
    let mut title: Option<String> = None;
    let mut in_first_heading = false;
    let mut heading_text = String::new();
    let mut body = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { .. }) if title.is_none() => {
                in_first_heading = true;
            }
            Event::End(TagEnd::Heading(_)) if in_first_heading => {
                in_first_heading = false;
                title = Some(heading_text.trim().to_string());
            }
            Event::Text(text) | Event::Code(text) => {
                if in_first_heading {
                    heading_text.push_str(&text);
                } else {
                    body.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => body.push(' '),
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Item) => {
                body.push('\n');
            }
            _ => {}
        }
    }

    let content = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Document {
        id: id.to_string(),
        title: title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title.to_string()),
        content,
        origin: origin.to_string(),
        category: "custom".to_string(),
    }
}

/// Prefix of markdown document ids, keeping them apart from built-in records
pub const CUSTOM_ID_PREFIX: &str = "custom:";

/// Load every `.md` file in `dir` as a document, sorted by file name.
/// Ids are the file stem under `CUSTOM_ID_PREFIX`.
pub async fn load_markdown_dir(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(Error::Io)?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(Error::Io)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let markdown = tokio::fs::read_to_string(&path).await.map_err(Error::Io)?;
        let id = format!("{}{}", CUSTOM_ID_PREFIX, stem);
        let document = parse_markdown(&id, &stem, &file_name, &markdown);

        if document.content.is_empty() {
            warn!(file = %file_name, "skipping markdown file with no text");
            continue;
        }

        debug!(file = %file_name, title = %document.title, "loaded markdown document");
        documents.push(document);
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_documents() {
        let docs = builtin_documents();
        assert_eq!(docs.len(), 10);
        assert!(docs.iter().any(|d| d.id == "docker_intro" && d.title == "Docker Containerization"));
    }

    #[test]
    fn test_parse_markdown_uses_first_heading() {
        let doc = parse_markdown(
            "rust",
            "rust",
            "rust.md",
            "# Rust Language\n\nRust is a *systems* language.\n\n## Ownership\n\n- borrow checker\n",
        );

        assert_eq!(doc.title, "Rust Language");
        assert_eq!(doc.content, "Rust is a systems language.\nOwnership\nborrow checker");
        assert_eq!(doc.category, "custom");
    }

    #[test]
    fn test_parse_markdown_without_heading() {
        let doc = parse_markdown("notes", "notes", "notes.md", "Just a paragraph.");
        assert_eq!(doc.title, "notes");
        assert_eq!(doc.content, "Just a paragraph.");
    }
}
