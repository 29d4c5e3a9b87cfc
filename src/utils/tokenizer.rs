use crate::error::{Error, Result};
use crate::index::node_path::NodePath;
use crate::index::types::{TaggedToken, TokenPosition};
use ahash::AHashMap;

/// Parse `term@0.1` notation into tagged tokens.
///
/// Items are separated by whitespace. The part after `@` is the node path,
/// components separated by dots. An optional `#datatype` suffix overrides
/// the default datatype. Positions are assigned per node in order of
/// appearance, so `a@0 b@0 c@1` puts `a` at 0 and `b` at 1 in node `[0]`,
/// and `c` at 0 in node `[1]`.
pub fn parse_tagged(input: &str) -> Result<Vec<TaggedToken>> {
    let mut next_position: AHashMap<NodePath, TokenPosition> = AHashMap::new();
    let mut tokens = Vec::new();

    for item in input.split_whitespace() {
        let (term, rest) = item
            .rsplit_once('@')
            .ok_or_else(|| Error::config(format!("token '{}' has no node path", item)))?;
        if term.is_empty() {
            return Err(Error::config(format!("token '{}' has an empty term", item)));
        }
        let (path, datatype) = match rest.split_once('#') {
            Some((path, datatype)) => (path, Some(datatype)),
            None => (rest, None),
        };
        let node = parse_path(path)?;

        let position = next_position.entry(node.clone()).or_insert(0);
        let mut token = TaggedToken::new(term, node, *position);
        *position += 1;
        if let Some(datatype) = datatype {
            token = token.with_datatype(datatype);
        }
        tokens.push(token);
    }

    Ok(tokens)
}

/// Parse a dotted node path such as `0.2.1`.
pub fn parse_path(path: &str) -> Result<NodePath> {
    if path.is_empty() {
        return Err(Error::config("empty node path"));
    }
    let components = path
        .split('.')
        .map(|c| {
            c.parse::<u32>()
                .map_err(|_| Error::config(format!("invalid node path component '{}' in '{}'", c, path)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(NodePath::new(components))
}
