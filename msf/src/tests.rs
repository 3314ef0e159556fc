use super::*;
use std::sync::Mutex;

#[static_init::dynamic]
static INIT_LOGGER: () = {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_test_writer()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(tracing::Level::DEBUG)
        .compact()
        .without_time()
        .finish();
};

/// A trivial in-memory [`ReadAt`] source used to build synthetic MSF images for tests, in the
/// same style as the original crate's `TestFile`.
#[derive(Default)]
struct TestFile {
    data: Mutex<Vec<u8>>,
}

impl ReadAt for TestFile {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
        let lock = self.data.lock().unwrap();
        lock.read_exact_at(buf, offset)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        let lock = self.data.lock().unwrap();
        lock.read_at(buf, offset)
    }
}

/// Builds the smallest possible well-formed PDB7 image: one page holding the superblock and
/// root-index page list, one page holding the root directory bytes, and `stream_data` pages for
/// each entry of `streams` (each padded up to a whole page).
fn build_msf_image(page_size: u32, streams: &[&[u8]]) -> Vec<u8> {
    let page_size_usize = page_size as usize;

    // Page 0: superblock. Page 1: root directory bytes. Page 2: root-index page list lives
    // inline in page 0 (it is tiny), but the pages it points to (the root directory) start at
    // page 1 here, since that's the simplest arrangement that satisfies the format.
    let mut stream_pages: Vec<Vec<u8>> = Vec::new();
    let mut stream_sizes: Vec<u32> = Vec::new();
    for &s in streams {
        stream_sizes.push(s.len() as u32);
        let mut padded = s.to_vec();
        padded.resize(s.len().div_ceil(page_size_usize).max(1) * page_size_usize, 0);
        stream_pages.push(padded);
    }

    // Build the root directory bytes: num_streams, stream_sizes[], then page lists per stream.
    let mut root_dir: Vec<u8> = Vec::new();
    root_dir.extend_from_slice(&(streams.len() as u32).to_le_bytes());
    for &size in &stream_sizes {
        root_dir.extend_from_slice(&size.to_le_bytes());
    }

    // Stream data pages start right after: page 0 (superblock), page 1 (root directory, assumed
    // to fit in a single page for these small tests).
    let mut next_page: u32 = 2;
    let mut stream_page_numbers: Vec<Vec<u32>> = Vec::new();
    for (size, padded) in stream_sizes.iter().zip(stream_pages.iter()) {
        let n = if *size == 0 {
            0
        } else {
            padded.len() / page_size_usize
        };
        let pages: Vec<u32> = (next_page..next_page + n as u32).collect();
        next_page += n as u32;
        stream_page_numbers.push(pages);
    }
    for pages in &stream_page_numbers {
        for &p in pages {
            root_dir.extend_from_slice(&p.to_le_bytes());
        }
    }
    assert!(
        root_dir.len() <= page_size_usize,
        "test root directory must fit in one page"
    );

    let root_size = root_dir.len() as u32;
    let num_file_pages = next_page;

    // Page 0: 32-byte signature + MsfHeader + root-index page list (here, just [1]).
    let mut page0 = vec![0u8; page_size_usize];
    page0[..32].copy_from_slice(&MSF_BIG_MAGIC);
    page0[32..36].copy_from_slice(&page_size.to_le_bytes());
    page0[36..40].copy_from_slice(&1u32.to_le_bytes()); // active_fpm
    page0[40..44].copy_from_slice(&num_file_pages.to_le_bytes());
    page0[44..48].copy_from_slice(&root_size.to_le_bytes());
    page0[48..52].copy_from_slice(&0u32.to_le_bytes()); // reserved
    page0[52..56].copy_from_slice(&1u32.to_le_bytes()); // root-index page list: [page 1]

    let mut page1 = vec![0u8; page_size_usize];
    page1[..root_dir.len()].copy_from_slice(&root_dir);

    let mut image = vec![0u8; num_file_pages as usize * page_size_usize];
    image[0..page_size_usize].copy_from_slice(&page0);
    image[page_size_usize..2 * page_size_usize].copy_from_slice(&page1);
    for (pages, padded) in stream_page_numbers.iter().zip(stream_pages.iter()) {
        for (i, &p) in pages.iter().enumerate() {
            let src = &padded[i * page_size_usize..(i + 1) * page_size_usize];
            let dst_start = p as usize * page_size_usize;
            image[dst_start..dst_start + page_size_usize].copy_from_slice(src);
        }
    }

    image
}

fn open_image(image: Vec<u8>) -> MsfResult<Msf<TestFile>> {
    let file = TestFile {
        data: Mutex::new(image),
    };
    Msf::open(file)
}

#[test]
fn opens_minimal_three_stream_pdb() {
    // Scenario 1 from spec.md §8: page_size=0x1000, 3 streams (PDB-Info, TPI empty, DBI empty).
    let image = build_msf_image(0x1000, &[b"pdbi-bytes", b"", b""]);
    let msf = open_image(image).expect("should open");

    assert_eq!(msf.page_size(), PageSize::from_exponent(12));
    assert_eq!(msf.num_streams(), 3);
    assert_eq!(msf.stream_size(0), 10);
    assert_eq!(msf.stream_size(1), 0);
    assert_eq!(msf.stream_size(2), 0);

    let data = msf.read_stream_to_vec(0).unwrap();
    assert_eq!(data, b"pdbi-bytes");
}

#[test]
fn bad_signature_is_rejected() {
    // Scenario 2 from spec.md §8: first 32 bytes are zeros.
    let image = vec![0u8; 0x1000];
    let err = open_image(image).unwrap_err();
    assert_eq!(err, MsfError::BadSignature);
}

#[test]
fn legacy_small_msf_is_unsupported_version() {
    let mut image = vec![0u8; 0x1000];
    image[..MSF_SMALL_MAGIC.len()].copy_from_slice(&MSF_SMALL_MAGIC);
    let err = open_image(image).unwrap_err();
    assert_eq!(err, MsfError::UnsupportedVersion);
}

#[test]
fn stream_reader_zero_fills_past_end_and_sets_sticky_error() {
    let image = build_msf_image(0x1000, &[b"abcd"]);
    let msf = open_image(image).unwrap();
    let mut reader = msf.get_stream_reader(0).unwrap();

    let mut buf = [0xffu8; 8];
    reader.read_exact_into(&mut buf).unwrap();

    assert_eq!(&buf[..4], b"abcd");
    assert_eq!(&buf[4..], &[0, 0, 0, 0]);
    assert!(reader.has_error());
}

#[test]
fn read_spanning_multiple_pages() {
    let page_size = 0x40u32; // tiny page size so a stream needs several pages
    let mut big = Vec::new();
    for i in 0..300u32 {
        big.extend_from_slice(&i.to_le_bytes());
    }
    let image = build_msf_image(page_size, &[&big]);
    let msf = open_image(image).unwrap();

    let data = msf.read_stream_to_vec(0).unwrap();
    assert_eq!(data, big);
}

#[test]
fn invalid_stream_index_is_rejected() {
    let image = build_msf_image(0x1000, &[b"x"]);
    let msf = open_image(image).unwrap();
    let err = msf.get_stream_reader(5).unwrap_err();
    assert_eq!(err, MsfError::BadStream(5));
}
