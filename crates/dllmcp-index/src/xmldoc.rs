//! Sidecar documentation files (`<doc><members><member name="...">`).

use dllmcp_core::{AuthoredDocs, DllMcpError};
use roxmltree::{Document, Node};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Parsed documentation comments keyed by documentation identifier.
#[derive(Debug, Clone, Default)]
pub struct DocCommentStore {
    entries: HashMap<String, AuthoredDocs>,
}

impl DocCommentStore {
    /// Load a documentation file.
    ///
    /// A missing file yields `Ok(None)`; a file that is present but not
    /// well-formed yields `MalformedDocumentation`.
    pub fn load(path: &Path) -> Result<Option<Self>, DllMcpError> {
        if !path.is_file() {
            return Ok(None);
        }
        let xml = std::fs::read_to_string(path).map_err(|e| {
            DllMcpError::MalformedDocumentation(format!("{}: {e}", path.display()))
        })?;
        Self::parse(&xml)
            .map(Some)
            .map_err(|e| match e {
                DllMcpError::MalformedDocumentation(msg) => {
                    DllMcpError::MalformedDocumentation(format!("{}: {msg}", path.display()))
                }
                other => other,
            })
    }

    /// Parse documentation XML held in memory.
    pub fn parse(xml: &str) -> Result<Self, DllMcpError> {
        let document =
            Document::parse(xml).map_err(|e| DllMcpError::MalformedDocumentation(e.to_string()))?;

        let mut entries = HashMap::new();
        let members = document
            .root_element()
            .children()
            .find(|node| node.is_element() && node.tag_name().name() == "members");

        for member in members
            .iter()
            .flat_map(|m| m.children())
            .filter(|node| node.is_element() && node.tag_name().name() == "member")
        {
            let Some(name) = member.attribute("name") else {
                continue;
            };
            // Later entries with the same name win.
            entries.insert(name.to_string(), read_member(member));
        }

        Ok(Self { entries })
    }

    /// Authored fields for `id`, or `None` when the file has no entry.
    pub fn lookup(&self, id: &str) -> Option<&AuthoredDocs> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_member(member: Node<'_, '_>) -> AuthoredDocs {
    AuthoredDocs {
        summary: child_text(member, "summary"),
        remarks: child_text(member, "remarks"),
        returns: child_text(member, "returns"),
        example: child_text(member, "example"),
        params: keyed_children(member, "param", "name"),
        exceptions: keyed_children(member, "exception", "cref"),
    }
}

fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == tag)
}

/// Trimmed text of the first `tag` child, including text nested in inline
/// elements such as `<c>` or `<para>`.
fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    elements(node, tag).next().map(inner_text)
}

fn keyed_children(node: Node<'_, '_>, tag: &str, key: &str) -> BTreeMap<String, String> {
    elements(node, tag)
        .filter_map(|child| {
            let name = child.attribute(key)?;
            Some((name.to_string(), inner_text(child)))
        })
        .collect()
}

fn inner_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<doc>
    <assembly>
        <name>TestAssembly</name>
    </assembly>
    <members>
        <member name="T:Test.Calculator">
            <summary>
                A simple calculator.
            </summary>
            <remarks>Thread-safe.</remarks>
        </member>
        <member name="M:Test.Calculator.Add(System.Int32,System.Int32)">
            <summary>Adds two integers</summary>
            <param name="a">First operand</param>
            <param name="b">Second operand</param>
            <returns>The sum of <c>a</c> and <c>b</c>.</returns>
            <exception cref="T:System.OverflowException">On overflow.</exception>
            <example>calc.Add(1, 2)</example>
        </member>
        <member name="P:Test.Calculator.CurrentValue">
            <summary>first</summary>
        </member>
        <member name="P:Test.Calculator.CurrentValue">
            <summary>second</summary>
        </member>
        <member>
            <summary>nameless entries are ignored</summary>
        </member>
    </members>
</doc>"#;

    #[test]
    fn lookup_returns_authored_fields() {
        let store = DocCommentStore::parse(SAMPLE).unwrap();
        let add = store
            .lookup("M:Test.Calculator.Add(System.Int32,System.Int32)")
            .unwrap();
        assert_eq!(add.summary.as_deref(), Some("Adds two integers"));
        assert_eq!(add.returns.as_deref(), Some("The sum of a and b."));
        assert_eq!(add.example.as_deref(), Some("calc.Add(1, 2)"));
        assert_eq!(add.remarks, None);
        assert_eq!(add.params.get("a").map(String::as_str), Some("First operand"));
        assert_eq!(add.params.get("b").map(String::as_str), Some("Second operand"));
        assert_eq!(
            add.exceptions
                .get("T:System.OverflowException")
                .map(String::as_str),
            Some("On overflow.")
        );
    }

    #[test]
    fn text_is_trimmed_and_maps_are_empty_when_undeclared() {
        let store = DocCommentStore::parse(SAMPLE).unwrap();
        let ty = store.lookup("T:Test.Calculator").unwrap();
        assert_eq!(ty.summary.as_deref(), Some("A simple calculator."));
        assert_eq!(ty.remarks.as_deref(), Some("Thread-safe."));
        assert!(ty.params.is_empty());
        assert!(ty.exceptions.is_empty());
    }

    #[test]
    fn unknown_ids_are_not_errors() {
        let store = DocCommentStore::parse(SAMPLE).unwrap();
        assert!(store.lookup("T:NonExistent.Class").is_none());
        assert!(!store.contains("T:NonExistent.Class"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn duplicate_names_keep_the_last_entry() {
        let store = DocCommentStore::parse(SAMPLE).unwrap();
        let prop = store.lookup("P:Test.Calculator.CurrentValue").unwrap();
        assert_eq!(prop.summary.as_deref(), Some("second"));
    }

    #[test]
    fn malformed_xml_is_reported() {
        let err = DocCommentStore::parse("<doc><members><member name=\"x\"></doc>").unwrap_err();
        assert!(matches!(err, DllMcpError::MalformedDocumentation(_)));
    }

    #[test]
    fn missing_members_element_means_empty_store() {
        let store = DocCommentStore::parse("<doc><assembly/></doc>").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = DocCommentStore::load(&dir.path().join("absent.xml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_reads_file_and_reports_bad_files_with_path() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(SAMPLE.as_bytes()).unwrap();
        let store = DocCommentStore::load(good.path()).unwrap().unwrap();
        assert!(store.contains("T:Test.Calculator"));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"<doc><members>").unwrap();
        let err = DocCommentStore::load(bad.path()).unwrap_err();
        assert!(matches!(err, DllMcpError::MalformedDocumentation(_)));
        assert!(err
            .to_string()
            .contains(&bad.path().display().to_string()));
    }
}
