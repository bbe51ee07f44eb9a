/// Split synthesized audio into fixed-size chunks with zero-based indices.
///
/// The final chunk may be shorter; empty audio yields no chunks. Concatenating
/// the chunks in index order reproduces `audio` exactly.
pub fn chunk_audio(audio: &[u8], chunk_size: usize) -> impl Iterator<Item = (usize, &[u8])> {
    assert!(chunk_size > 0, "chunk size must be positive");
    audio.chunks(chunk_size).enumerate()
}

/// Number of chunks `chunk_audio` yields for `len` bytes
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}
