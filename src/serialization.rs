//! Plain text form of a [`SparseGridData`].
//!
//! The first line holds the dimension, the number of points and one
//! `lower upper` pair per dimension, optionally followed by the keyword
//! `boundary`. Every following line describes one point in sequence order as
//! `level index leaf` triples, one per dimension.

use std::io::{BufRead, Write};

use crate::errors::SGError;
use crate::storage::{BoundingBox, GridPoint, SparseGridData};

const BOUNDARY_KEYWORD: &str = "boundary";

pub fn serialize(storage: &SparseGridData) -> String
{
    let mut r = String::new();
    let bbox = storage.bounding_box();
    r.push_str(&format!("{} {}", storage.num_inputs(), storage.len()));
    for d in 0..storage.num_inputs()
    {
        r.push_str(&format!(" {:?} {:?}", bbox.lower[d], bbox.upper[d]));
    }
    if storage.has_boundary()
    {
        r.push(' ');
        r.push_str(BOUNDARY_KEYWORD);
    }
    r.push('\n');
    for node in storage.nodes()
    {
        let leaf = node.is_leaf() as u8;
        let line: Vec<String> = node.level().iter().zip(node.index().iter()).map(|(l, i)| format!("{l} {i} {leaf}")).collect();
        r.push_str(&line.join(" "));
        r.push('\n');
    }
    r
}

pub fn write<W: Write>(storage: &SparseGridData, writer: &mut W) -> Result<(), SGError>
{
    writer.write_all(serialize(storage).as_bytes()).map_err(|e| SGError::WriteBufferFailed(e.to_string()))?;
    writer.flush().map_err(|e| SGError::WriteBufferFailed(e.to_string()))
}

pub fn read<R: BufRead>(reader: R) -> Result<SparseGridData, SGError>
{
    let mut lines = Vec::new();
    for line in reader.lines()
    {
        lines.push(line.map_err(|e| SGError::ReadBufferFailed(e.to_string()))?);
    }
    parse_lines(lines.iter().map(|s| s.as_str()))
}

pub fn deserialize(text: &str) -> Result<SparseGridData, SGError>
{
    parse_lines(text.lines())
}

fn parse_error(line: usize, reason: impl Into<String>) -> SGError
{
    SGError::Parse { line, reason: reason.into() }
}

fn parse_token<T: std::str::FromStr>(token: &str, line: usize, what: &str) -> Result<T, SGError>
{
    token.parse::<T>().map_err(|_| parse_error(line, format!("invalid {what} `{token}`")))
}

fn parse_lines<'a>(mut lines: impl Iterator<Item = &'a str>) -> Result<SparseGridData, SGError>
{
    let header = lines.next().ok_or_else(|| parse_error(1, "missing header"))?;
    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() < 2
    {
        return Err(parse_error(1, "header needs dimension and point count"));
    }
    let num_inputs: usize = parse_token(tokens[0], 1, "dimension")?;
    let num_points: usize = parse_token(tokens[1], 1, "point count")?;
    let bbox_end = num_inputs.checked_mul(2).and_then(|n| n.checked_add(2))
        .ok_or_else(|| parse_error(1, format!("dimension {num_inputs} is out of range")))?;
    let has_boundary = match tokens.len()
    {
        n if n == bbox_end => false,
        n if n == bbox_end + 1 && tokens[bbox_end] == BOUNDARY_KEYWORD => true,
        _ => return Err(parse_error(1, format!("expected {} bounding box values", 2 * num_inputs))),
    };
    let mut lower = Vec::with_capacity(num_inputs);
    let mut upper = Vec::with_capacity(num_inputs);
    for d in 0..num_inputs
    {
        lower.push(parse_token::<f64>(tokens[2 + 2 * d], 1, "lower bound")?);
        upper.push(parse_token::<f64>(tokens[3 + 2 * d], 1, "upper bound")?);
    }
    let bounding_box = BoundingBox::new(&lower, &upper).map_err(|e| parse_error(1, e.to_string()))?;

    let mut storage = if has_boundary { SparseGridData::with_boundary(num_inputs) } else { SparseGridData::new(num_inputs) };
    storage.set_bounding_box(bounding_box).map_err(|e| parse_error(1, e.to_string()))?;

    let mut level = vec![0u8; num_inputs];
    let mut index = vec![0u32; num_inputs];
    for seq in 0..num_points
    {
        let line_number = seq + 2;
        let line = lines.next().ok_or_else(|| parse_error(line_number, format!("expected {num_points} points, found {seq}")))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 3 * num_inputs
        {
            return Err(parse_error(line_number, format!("expected {} values, found {}", 3 * num_inputs, tokens.len())));
        }
        let mut leaf_flag = None;
        for d in 0..num_inputs
        {
            level[d] = parse_token(tokens[3 * d], line_number, "level")?;
            index[d] = parse_token(tokens[3 * d + 1], line_number, "index")?;
            let flag = match tokens[3 * d + 2]
            {
                "0" => false,
                "1" => true,
                other => return Err(parse_error(line_number, format!("invalid leaf flag `{other}`"))),
            };
            if matches!(leaf_flag, Some(previous) if previous != flag)
            {
                return Err(parse_error(line_number, "leaf flags differ between dimensions"));
            }
            leaf_flag = Some(flag);
        }
        let is_leaf = leaf_flag.unwrap_or(false);
        storage.insert_raw(GridPoint::new(&level, &index, is_leaf), is_leaf).map_err(|e| parse_error(line_number, e.to_string()))?;
    }
    if let Some((offset, _)) = lines.enumerate().find(|(_, line)| !line.trim().is_empty())
    {
        return Err(parse_error(num_points + 2 + offset, "trailing data after the last point"));
    }
    Ok(storage)
}
