//! Packaged single-operator TopK graph
//!
//! The graph is encoded in-process from the handful of ONNX protobuf messages
//! it needs, once per process, and shared as bytes:
//!
//! ```text
//! logits: f32[...]  ─┐
//!                    ├─ TopK(axis=-1, largest=1, sorted=1) ─┬─ values:  f32[...]
//! k:      i64[1]    ─┘                                      └─ indices: i64[...]
//! ```

use std::sync::{Arc, OnceLock};

use prost::Message;

/// Input holding the scores
pub const INPUT_LOGITS: &str = "logits";
/// Input holding the number of results per lane
pub const INPUT_K: &str = "k";
/// Output holding the selected scores
pub const OUTPUT_VALUES: &str = "values";
/// Output holding the positions of the selected scores
pub const OUTPUT_INDICES: &str = "indices";

const IR_VERSION: i64 = 8;
const OPSET_VERSION: i64 = 17;

const ELEM_FLOAT: i32 = 1;
const ELEM_INT64: i32 = 7;
const ATTRIBUTE_INT: i32 = 2;

#[derive(Clone, PartialEq, Message)]
struct ModelProto {
    #[prost(int64, tag = "1")]
    ir_version: i64,
    #[prost(string, tag = "2")]
    producer_name: String,
    #[prost(message, optional, tag = "7")]
    graph: Option<GraphProto>,
    #[prost(message, repeated, tag = "8")]
    opset_import: Vec<OperatorSetIdProto>,
}

#[derive(Clone, PartialEq, Message)]
struct GraphProto {
    #[prost(message, repeated, tag = "1")]
    node: Vec<NodeProto>,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(message, repeated, tag = "11")]
    input: Vec<ValueInfoProto>,
    #[prost(message, repeated, tag = "12")]
    output: Vec<ValueInfoProto>,
}

#[derive(Clone, PartialEq, Message)]
struct NodeProto {
    #[prost(string, repeated, tag = "1")]
    input: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    output: Vec<String>,
    #[prost(string, tag = "3")]
    name: String,
    #[prost(string, tag = "4")]
    op_type: String,
    #[prost(message, repeated, tag = "5")]
    attribute: Vec<AttributeProto>,
    #[prost(string, tag = "7")]
    domain: String,
}

#[derive(Clone, PartialEq, Message)]
struct AttributeProto {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(int64, tag = "3")]
    i: i64,
    #[prost(int32, tag = "20")]
    r#type: i32,
}

#[derive(Clone, PartialEq, Message)]
struct ValueInfoProto {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(message, optional, tag = "2")]
    r#type: Option<TypeProto>,
}

#[derive(Clone, PartialEq, Message)]
struct TypeProto {
    #[prost(message, optional, tag = "1")]
    tensor_type: Option<TensorTypeProto>,
}

#[derive(Clone, PartialEq, Message)]
struct TensorTypeProto {
    #[prost(int32, tag = "1")]
    elem_type: i32,
    #[prost(message, optional, tag = "2")]
    shape: Option<TensorShapeProto>,
}

#[derive(Clone, PartialEq, Message)]
struct TensorShapeProto {
    #[prost(message, repeated, tag = "1")]
    dim: Vec<DimensionProto>,
}

#[derive(Clone, PartialEq, Message)]
struct DimensionProto {
    #[prost(oneof = "dimension::Value", tags = "1")]
    value: Option<dimension::Value>,
}

mod dimension {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub(super) enum Value {
        #[prost(int64, tag = "1")]
        DimValue(i64),
    }
}

#[derive(Clone, PartialEq, Message)]
struct OperatorSetIdProto {
    #[prost(string, tag = "1")]
    domain: String,
    #[prost(int64, tag = "2")]
    version: i64,
}

fn int_attribute(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        i: value,
        r#type: ATTRIBUTE_INT,
    }
}

/// Tensor value info; `None` leaves the rank unconstrained
fn tensor_value(name: &str, elem_type: i32, dims: Option<&[i64]>) -> ValueInfoProto {
    let shape = dims.map(|dims| TensorShapeProto {
        dim: dims
            .iter()
            .map(|&extent| DimensionProto {
                value: Some(dimension::Value::DimValue(extent)),
            })
            .collect(),
    });
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            tensor_type: Some(TensorTypeProto { elem_type, shape }),
        }),
    }
}

fn build_model() -> ModelProto {
    let node = NodeProto {
        input: vec![INPUT_LOGITS.to_string(), INPUT_K.to_string()],
        output: vec![OUTPUT_VALUES.to_string(), OUTPUT_INDICES.to_string()],
        name: "topk".to_string(),
        op_type: "TopK".to_string(),
        attribute: vec![
            int_attribute("axis", -1),
            int_attribute("largest", 1),
            int_attribute("sorted", 1),
        ],
        domain: String::new(),
    };

    ModelProto {
        ir_version: IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        graph: Some(GraphProto {
            node: vec![node],
            name: "topk_last_axis".to_string(),
            input: vec![
                tensor_value(INPUT_LOGITS, ELEM_FLOAT, None),
                tensor_value(INPUT_K, ELEM_INT64, Some(&[1])),
            ],
            output: vec![
                tensor_value(OUTPUT_VALUES, ELEM_FLOAT, None),
                tensor_value(OUTPUT_INDICES, ELEM_INT64, None),
            ],
        }),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: OPSET_VERSION,
        }],
    }
}

/// Serialized ONNX model, encoded on first use
pub fn model_bytes() -> Arc<[u8]> {
    static MODEL: OnceLock<Arc<[u8]>> = OnceLock::new();
    MODEL
        .get_or_init(|| Arc::from(build_model().encode_to_vec()))
        .clone()
}
