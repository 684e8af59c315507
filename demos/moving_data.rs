//! Example: Moving Data Between Endpoints
//!
//! Packs an integer, a double and a string with the decomposed handler
//! primitives, then plays the receiving side: the bytes are copied into a
//! "transport" region and unpacked from there without another copy.
//!
//! Both sides are written against `SerializationHandler`, so the same code
//! runs on the global heap and with a recycling buffer pool.
//!
//! Run: cargo run --example moving_data

#![allow(missing_docs)]

use tripack::{
    BorrowedBuffer, PooledAllocator, SerializationBuffer, SerializationHandler, SimpleHandler,
};

/// Sender: size, pack and extract.
fn send<H: SerializationHandler>(
    handler: &H,
    i: i32,
    val: f64,
    text: &str,
) -> tripack::Result<H::Buffer> {
    let mut sizing = handler.make_sizing_archive();
    sizing.add(&i).add(&val).add(text);
    println!("Sizing pass: {} bytes", sizing.size());

    let mut packing = handler.make_packing_archive(sizing)?;
    packing.pack(&i)?.pack(&val)?.pack(text)?;
    handler.extract_buffer(packing)
}

/// Receiver: unpack straight out of the transport's region.
fn receive<H: SerializationHandler>(
    handler: &H,
    message: &[u8],
) -> tripack::Result<(i32, f64, String)> {
    let received = BorrowedBuffer::new(message);
    let (mut i, mut val, mut text) = (0i32, 0.0f64, String::new());
    let mut ar = handler.make_unpacking_archive(&received);
    ar.unpack_into(&mut i)?
        .unpack_into(&mut val)?
        .unpack_into(&mut text)?;
    handler.finish_unpacking(&ar)?;
    Ok((i, val, text))
}

fn run<H: SerializationHandler>(label: &str, handler: &H) -> tripack::Result<Vec<u8>> {
    println!("\n[{label}]");
    let (i, val, text) = (42i32, 3.14f64, "hello world");

    // 1. Sender
    let buffer = send(handler, i, val, text)?;

    // 2. Transport: the message lands in memory owned by someone else
    let message: Vec<u8> = buffer.data().to_vec();
    drop(buffer);
    println!("Message on the wire: {} bytes", message.len());

    // 3. Receiver
    let (i2, val2, text2) = receive(handler, &message)?;
    println!("Received: i = {i2}, val = {val2}, str = {text2:?}");
    assert_eq!((i2, val2, text2.as_str()), (i, val, text));
    Ok(message)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Tripack Moving Data Example ---");

    let heap = run("global heap", &SimpleHandler::new())?;

    let pool = PooledAllocator::new();
    let pooled = SimpleHandler::with_allocator(pool.clone());
    let recycled = run("buffer pool", &pooled)?;
    run("buffer pool, second message", &pooled)?;
    println!("Pool hits: {}, misses: {}", pool.hits(), pool.misses());

    // The handler decides where bytes live, never what they are.
    assert_eq!(heap, recycled);

    // 4. The same message through the one-call façade
    let again = tripack::serialize(&(42i32, 3.14f64, String::from("hello world")))?;
    assert_eq!(again.data(), heap.as_slice());
    let (i3, val3, text3): (i32, f64, String) = tripack::deserialize(&again)?;
    println!("\nFaçade round trip: i = {i3}, val = {val3}, str = {text3:?}");

    Ok(())
}
