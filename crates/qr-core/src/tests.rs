//! Snapshot tests for core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{Caption, ConversationTurn, Document, Role};
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_caption_snapshot() {
        let caption = Caption::from_text("  a cat sitting on a wooden table next to a laptop  ");

        assert_yaml_snapshot!(caption, @r###"
        text: a cat sitting on a wooden table next to a laptop
        tags:
          - cat
          - sitting
          - wooden
          - table
          - laptop
        "###);
    }

    #[test]
    fn test_searchable_text() {
        let doc = Document {
            id: "git_basics".to_string(),
            title: "Git Version Control".to_string(),
            content: "\nGit is a distributed version control system.\n".to_string(),
            origin: "git_guide.md".to_string(),
            category: "tools".to_string(),
        };

        assert_eq!(
            doc.searchable_text(),
            "Git Version Control\n\nGit is a distributed version control system."
        );
    }

    #[test]
    fn test_turn_roles() {
        let user = ConversationTurn::user("hello");
        let assistant = ConversationTurn::assistant("hi there");

        assert_eq!(user.role, Role::User);
        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant.timestamp >= user.timestamp);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
