//! Page-size arithmetic and the page-list mapper shared by [`crate::read::read_stream_core`].

use crate::{Page, PageSize, NIL_STREAM_SIZE};
use pow2::IntOnlyPow2;

/// Given the size of a stream in bytes, returns the number of pages needed to store it.
///
/// Correctly handles the case where the stream size is [`NIL_STREAM_SIZE`] (returns 0) and the
/// case where the stream size is 0 (also returns 0).
pub(crate) fn num_pages_for_stream_size(stream_size: u32, page_size: PageSize) -> u32 {
    if stream_size == NIL_STREAM_SIZE || stream_size == 0 {
        0
    } else {
        stream_size.div_round_up(page_size)
    }
}

/// Maps a byte range within a stream to the longest contiguous run of bytes in the underlying MSF
/// file that covers the start of that range.
///
/// This is the core of the Stream View address translation described in spec.md §4.2: logical
/// offset `pos` maps to `(page_slot = pos / page_size, byte_in_page = pos % page_size)`, then to
/// `file_offset = page_list[page_slot] * page_size + byte_in_page`. Reads that would span more
/// than one page are serviced by repeated calls to this function, coalescing runs of physically
/// contiguous pages into a single transfer when possible.
pub(crate) struct StreamPageMapper<'a> {
    pages: &'a [Page],
    page_size: PageSize,
    stream_size: u32,
}

impl<'a> StreamPageMapper<'a> {
    pub(crate) fn new(pages: &'a [Page], page_size: PageSize, stream_size: u32) -> Self {
        Self {
            pages,
            page_size,
            stream_size,
        }
    }

    /// Returns `(file_offset, transfer_len)` for the longest contiguous run starting at `pos`,
    /// clipped to `bytes_wanted`. Returns `None` if `pos >= stream_size` or `bytes_wanted == 0`.
    pub(crate) fn map(&self, pos: u32, bytes_wanted: u32) -> Option<(u64, u32)> {
        if pos >= self.stream_size || bytes_wanted == 0 {
            return None;
        }

        let bytes_available = self.stream_size - pos;
        let max_transfer_size = bytes_available.min(bytes_wanted);
        if max_transfer_size == 0 {
            return None;
        }

        let exponent = self.page_size.exponent();
        let page_size_u32 = u32::from(self.page_size);

        let first_page_index = pos >> exponent;
        let first_page_pointer = *self.pages.get(first_page_index as usize)?;
        let first_page_file_offset = (first_page_pointer as u64) << exponent;
        let offset_within_first_page = pos & (page_size_u32 - 1);
        let file_offset = first_page_file_offset + offset_within_first_page as u64;

        let bytes_available_first_page = page_size_u32 - offset_within_first_page;
        let transfer_size = if max_transfer_size > bytes_available_first_page {
            let mut p = pos + bytes_available_first_page;
            let mut last_page_ptr = first_page_pointer;

            loop {
                if p - pos == max_transfer_size {
                    break;
                }
                let p_page = p >> exponent;
                let Some(&p_ptr) = self.pages.get(p_page as usize) else {
                    break;
                };
                if p_ptr != last_page_ptr + 1 {
                    break;
                }
                let want_bytes = max_transfer_size - (p - pos);
                p += want_bytes.min(page_size_u32);
                last_page_ptr += 1;
            }

            p - pos
        } else {
            max_transfer_size
        };

        Some((file_offset, transfer_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_SIZE: PageSize = PageSize::from_exponent(12); // 0x1000

    #[test]
    fn nil_stream_maps_nothing() {
        let mapper = StreamPageMapper::new(&[], PAGE_SIZE, 0);
        assert_eq!(mapper.map(0, 0), None);
        assert_eq!(mapper.map(0, 0x1000), None);
    }

    #[test]
    fn basic_mapping() {
        let mapper = StreamPageMapper::new(&[5, 6, 7, 300, 301], PAGE_SIZE, 0x4abc);

        assert_eq!(mapper.map(0, 0), None);
        assert_eq!(mapper.map(0x1000_0000, 0x1000), None);

        assert_eq!(mapper.map(0, 0x10), Some((0x5000, 0x10)));
        assert_eq!(mapper.map(0, 0x1000), Some((0x5000, 0x1000)));
        assert_eq!(mapper.map(0, 0x1eee), Some((0x5000, 0x1eee)));
        assert_eq!(mapper.map(0, 0x3eee), Some((0x5000, 0x3000)));
        assert_eq!(mapper.map(0, 0x1000_0000), Some((0x5000, 0x3000)));

        assert_eq!(mapper.map(0xccc, 0x10), Some((0x5ccc, 0x10)));
        assert_eq!(mapper.map(0xccc, 0x1000), Some((0x5ccc, 0x1000)));
        assert_eq!(mapper.map(0xccc, 0x1000_0000), Some((0x5ccc, 0x2334)));
    }
}
