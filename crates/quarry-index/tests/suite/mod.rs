mod annotation_queries;
mod hierarchy_queries;
mod package_views;

use quarry_classfile::Indexer;
use quarry_index::Index;
use quarry_test_utils::ClassFileWriter;

/// Decode every writer into one index.
pub(crate) fn index_of(writers: &[&ClassFileWriter]) -> Index {
    let mut indexer = Indexer::new();
    for writer in writers {
        indexer.index(&writer.build()).expect("decode");
    }
    let (classes, modules, _store) = indexer.into_parts();
    Index::new(classes, modules)
}
