use blockfs::{Entry, FileSystem, FsError, DEFAULT_BLOCK_SIZE};

#[test]
fn writing_yields_one_block_per_chunk_and_the_exact_size() {
    let mut fs = FileSystem::new(64, DEFAULT_BLOCK_SIZE);
    fs.create_file("a.txt").unwrap();
    let data = vec![b'x'; 600];
    assert_eq!(fs.write_file("a.txt", &data).unwrap(), 600);

    let file = fs.current_dir().file("a.txt").unwrap();
    assert_eq!(file.size(), 600);
    // ceil(600 / 256) blocks.
    assert_eq!(file.blocks().len(), 3);
    assert_eq!(fs.free_blocks(), 61);
}

#[test]
fn creating_the_same_file_twice_conflicts_and_keeps_one() {
    let mut fs = FileSystem::new(8, 4);
    fs.create_file("a.txt").unwrap();
    match fs.create_file("a.txt") {
        Err(FsError::FileExists(name)) => assert_eq!(name, "a.txt"),
        other => panic!("expected a conflict, got {:?}", other),
    }
    let listing = fs.list_dir();
    assert_eq!(listing, vec![Entry::File("a.txt".to_string(), 0)]);
}

#[test]
fn making_the_same_directory_twice_conflicts() {
    let mut fs = FileSystem::new(8, 4);
    fs.make_dir("docs").unwrap();
    assert!(fs.make_dir("docs").is_err());
    assert_eq!(fs.list_dir().len(), 1);
}

#[test]
fn cd_dotdot_at_root_is_a_noop() {
    let mut fs = FileSystem::new(8, 4);
    fs.change_dir("..").unwrap();
    assert_eq!(fs.cwd_path(), "/");
}

#[test]
fn cd_to_a_missing_directory_leaves_the_cursor() {
    let mut fs = FileSystem::new(8, 4);
    fs.make_dir("docs").unwrap();
    fs.change_dir("docs").unwrap();
    assert!(fs.change_dir("missing").is_err());
    assert_eq!(fs.cwd_path(), "/docs/");
}

#[test]
fn cd_walks_down_and_back_up() {
    let mut fs = FileSystem::new(8, 4);
    fs.make_dir("a").unwrap();
    fs.change_dir("a").unwrap();
    fs.make_dir("b").unwrap();
    fs.change_dir("b").unwrap();
    assert_eq!(fs.cwd_path(), "/a/b/");
    fs.change_dir("..").unwrap();
    assert_eq!(fs.cwd_path(), "/a/");
}

#[test]
fn writing_to_a_missing_file_reports_not_found() {
    let mut fs = FileSystem::new(8, 4);
    match fs.write_file("ghost", b"data") {
        Err(FsError::FileNotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected not-found, got {:?}", other),
    }
    assert_eq!(fs.free_blocks(), 8);
}

#[test]
fn exhausting_the_pool_keeps_the_partial_write() {
    let mut fs = FileSystem::new(2, 4);
    fs.create_file("f").unwrap();
    // Needs 3 blocks, only 2 exist.
    match fs.write_file("f", b"abcdefghij") {
        Err(FsError::OutOfBlocks) => {}
        other => panic!("expected exhaustion, got {:?}", other),
    }
    let file = fs.current_dir().file("f").unwrap();
    assert_eq!(file.size(), 8);
    assert_eq!(file.blocks().len(), 2);
    assert_eq!(fs.free_blocks(), 0);
    assert_eq!(fs.read_file("f").unwrap(), "abcdefgh");
}

#[test]
fn second_write_appends_instead_of_replacing() {
    let mut fs = FileSystem::new(8, 4);
    fs.create_file("f").unwrap();
    fs.write_file("f", b"abcd").unwrap();
    fs.write_file("f", b"efgh").unwrap();

    let file = fs.current_dir().file("f").unwrap();
    assert_eq!(file.size(), 8);
    assert_eq!(file.blocks(), &[0, 1]);
    assert_eq!(fs.read_file("f").unwrap(), "abcdefgh");
}

#[test]
fn removing_a_file_returns_its_blocks_lowest_first() {
    let mut fs = FileSystem::new(8, 4);
    fs.create_file("a").unwrap();
    fs.write_file("a", b"aaaaaaaa").unwrap(); // blocks 0, 1
    fs.create_file("b").unwrap();
    fs.write_file("b", b"bbbb").unwrap(); // block 2

    fs.remove_file("a").unwrap();
    assert_eq!(fs.free_blocks(), 7);

    fs.create_file("c").unwrap();
    fs.write_file("c", b"cccc").unwrap();
    // The lowest freed index comes back first.
    assert_eq!(fs.current_dir().file("c").unwrap().blocks(), &[0]);
}

#[test]
fn removing_a_missing_file_reports_not_found() {
    let mut fs = FileSystem::new(8, 4);
    assert!(fs.remove_file("ghost").is_err());
}

#[test]
fn removing_a_directory_reclaims_nested_blocks() {
    let mut fs = FileSystem::new(8, 4);
    fs.make_dir("docs").unwrap();
    fs.change_dir("docs").unwrap();
    fs.make_dir("img").unwrap();
    fs.change_dir("img").unwrap();
    fs.create_file("deep").unwrap();
    fs.write_file("deep", b"12345678").unwrap();
    fs.change_dir("..").unwrap();
    fs.create_file("shallow").unwrap();
    fs.write_file("shallow", b"1234").unwrap();
    fs.change_dir("..").unwrap();
    assert_eq!(fs.free_blocks(), 5);

    fs.remove_dir("docs").unwrap();
    assert_eq!(fs.free_blocks(), 8);
    assert!(fs.current_dir().child("docs").is_none());
}

#[test]
fn listing_reports_directories_and_file_sizes() {
    let mut fs = FileSystem::new(8, 4);
    fs.make_dir("docs").unwrap();
    fs.create_file("a").unwrap();
    fs.write_file("a", b"12345").unwrap();

    let mut listing = fs.list_dir();
    listing.sort_by_key(|e| match e {
        Entry::Dir(name) => (0, name.clone()),
        Entry::File(name, _) => (1, name.clone()),
    });
    assert_eq!(
        listing,
        vec![
            Entry::Dir("docs".to_string()),
            Entry::File("a".to_string(), 5),
        ]
    );
}

#[test]
fn read_trims_trailing_padding_but_keeps_interior_bytes() {
    let mut fs = FileSystem::new(8, 4);
    fs.create_file("f").unwrap();
    fs.write_file("f", b"ab").unwrap();
    assert_eq!(fs.read_file("f").unwrap(), "ab");
    // The raw view exposes the padding of the tail block.
    assert_eq!(fs.read_file_raw("f").unwrap(), b"ab\0\0");
}

#[test]
fn four_blocks_of_four_bytes_scenario() {
    let mut fs = FileSystem::new(4, 4);
    fs.make_dir("docs").unwrap();
    fs.change_dir("docs").unwrap();
    fs.create_file("f").unwrap();
    fs.write_file("f", b"abcdefghij").unwrap();

    let file = fs.current_dir().file("f").unwrap();
    assert_eq!(file.size(), 10);
    assert_eq!(file.blocks().len(), 3);
    assert_eq!(fs.free_blocks(), 1);
    assert_eq!(fs.read_file("f").unwrap(), "abcdefghij");

    // One block left: a one-byte append fits and exhausts the pool. Because
    // writes only append, the padding of the old tail block stays in the
    // middle of the stream.
    fs.write_file("f", b"Z").unwrap();
    assert_eq!(fs.free_blocks(), 0);
    assert_eq!(fs.read_file("f").unwrap(), "abcdefghij\u{0}\u{0}Z");

    // And the next write has nothing left to allocate.
    match fs.write_file("f", b"Y") {
        Err(FsError::OutOfBlocks) => {}
        other => panic!("expected exhaustion, got {:?}", other),
    }
}
