use std::fs;
use std::path::Path;

use flamework::build::BuildState;

/// Assert no persisted document mentions `id`
pub fn assert_no_references(state: &BuildState, id: &str) {
    assert!(!state.references(id), "build state still references {}", id);
    for (owner, extended_by) in &state.build.extends {
        assert!(
            !extended_by.iter().any(|e| e == id),
            "extends[{}] still lists {}",
            owner,
            id
        );
    }
    for (owner, behaviour) in &state.build.behaviours {
        assert!(
            !behaviour.extends.iter().any(|e| e == id),
            "behaviours[{}].extends still lists {}",
            owner,
            id
        );
    }
}

/// Read an emitted file, failing with its path when it is missing
pub fn read_output(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("{}: {}", path.display(), err))
}
