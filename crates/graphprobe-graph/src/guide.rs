/// Query suggestions for exploring a group in the database browser.
///
/// The group id is inlined because the browser has no parameter binding;
/// quotes in it are escaped.
pub fn browser_guide(group_id: &str) -> Vec<(String, String)> {
    let group = group_id.replace('\\', "\\\\").replace('\'', "\\'");
    vec![
        (
            "All nodes in the group".to_string(),
            format!("MATCH (n) WHERE n.group_id = '{group}' RETURN n LIMIT 25"),
        ),
        (
            "Episodes, newest first".to_string(),
            format!(
                "MATCH (e:Episodic) WHERE e.group_id = '{group}' \
                 RETURN e ORDER BY e.created_at DESC"
            ),
        ),
        (
            "Entities".to_string(),
            format!("MATCH (e:Entity) WHERE e.group_id = '{group}' RETURN e ORDER BY e.name"),
        ),
        (
            "Fact relationships".to_string(),
            format!(
                "MATCH (a:Entity)-[r:RELATES_TO]->(b:Entity) WHERE r.group_id = '{group}' \
                 RETURN a, r, b LIMIT 25"
            ),
        ),
        (
            "Keyword search in episode content".to_string(),
            format!(
                "MATCH (e:Episodic) WHERE e.group_id = '{group}' \
                 AND toLower(e.content) CONTAINS 'keyword' RETURN e.name, e.content, e.source"
            ),
        ),
        (
            "Episodes from the last hour".to_string(),
            format!(
                "MATCH (e:Episodic) WHERE e.group_id = '{group}' \
                 AND e.created_at > datetime() - duration('PT1H') \
                 RETURN e ORDER BY e.created_at DESC"
            ),
        ),
        (
            "Full graph neighborhood".to_string(),
            format!(
                "MATCH (n) WHERE n.group_id = '{group}' \
                 OPTIONAL MATCH (n)-[r]-(m) WHERE r.group_id = '{group}' RETURN n, r, m LIMIT 50"
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::browser_guide;

    #[test]
    fn unit_browser_guide_scopes_every_query_to_group() {
        let guide = browser_guide("default");
        assert_eq!(guide.len(), 7);
        assert!(guide
            .iter()
            .all(|(_, query)| query.contains("group_id = 'default'")));
    }

    #[test]
    fn regression_browser_guide_escapes_quotes() {
        let guide = browser_guide("o'brien");
        assert!(guide[0].1.contains("'o\\'brien'"));
    }
}
