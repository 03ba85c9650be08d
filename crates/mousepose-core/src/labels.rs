//! Annotation projects seeded from suggested video frames.
//!
//! Projects are stored in SLEAP's labels JSON layout so that `sleap-train`
//! and the SLEAP labeling GUI open them directly. Skeleton nodes are written
//! once in the top-level `nodes` list and referenced by index everywhere else.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::LabelError;
use crate::skeleton::Skeleton;

/// Version tag of the SLEAP labels JSON layout.
pub const SLEAP_LABELS_VERSION: &str = "2.0.0";

/// How candidate frames are drawn from a video before clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMethod {
    Stride,
    Random,
}

impl SampleMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stride => "stride",
            Self::Random => "random",
        }
    }
}

/// Image features used to cluster candidate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Hog,
    Brisk,
    Raw,
}

impl FeatureType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hog => "hog",
            Self::Brisk => "brisk",
            Self::Raw => "raw",
        }
    }
}

/// Frame-suggestion parameters.
///
/// The defaults are the values every annotation project is seeded with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionParams {
    /// Candidate frames drawn per video.
    pub per_video: usize,
    /// Image downscale factor before feature extraction.
    pub scale: f64,
    pub sample_method: SampleMethod,
    pub feature_type: FeatureType,
    pub brisk_threshold: u32,
    /// PCA components kept before clustering.
    pub n_components: usize,
    pub n_clusters: usize,
    /// Frames picked from each cluster.
    pub per_cluster: usize,
}

impl Default for SuggestionParams {
    fn default() -> Self {
        Self {
            per_video: 50,
            scale: 0.25,
            sample_method: SampleMethod::Stride,
            feature_type: FeatureType::Hog,
            brisk_threshold: 10,
            n_components: 10,
            n_clusters: 10,
            per_cluster: 5,
        }
    }
}

/// A labeled 2D point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// One animal instance; `None` marks a node that has not been labeled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub points: Vec<Option<Point2>>,
}

impl Instance {
    /// Instance with every skeleton node unset.
    pub fn placeholder(skeleton: &Skeleton) -> Self {
        Self {
            points: vec![None; skeleton.nodes.len()],
        }
    }

    pub fn labeled_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub filename: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFrame {
    /// Index into [`LabelProject::videos`].
    pub video: usize,
    pub frame_idx: usize,
    pub instances: Vec<Instance>,
}

/// Annotation project: skeleton, videos and the frames to label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelProject {
    pub skeleton: Skeleton,
    pub videos: Vec<VideoRef>,
    pub labeled_frames: Vec<LabeledFrame>,
    pub suggestion_params: SuggestionParams,
}

impl LabelProject {
    /// Project over one video with a placeholder instance on every frame.
    pub fn seeded(
        skeleton: Skeleton,
        video: &Path,
        frames: &[usize],
        suggestion_params: SuggestionParams,
    ) -> Self {
        let labeled_frames = frames
            .iter()
            .map(|&frame_idx| LabeledFrame {
                video: 0,
                frame_idx,
                instances: vec![Instance::placeholder(&skeleton)],
            })
            .collect();
        Self {
            skeleton,
            videos: vec![VideoRef {
                filename: video.to_path_buf(),
            }],
            labeled_frames,
            suggestion_params,
        }
    }

    /// Write the project as SLEAP labels JSON, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), LabelError> {
        let json =
            serde_json::to_string_pretty(&self.to_document()).map_err(|source| LabelError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        fs::write(path, json).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a SLEAP labels JSON file. Only the first skeleton is kept.
    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let text = fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: LabelsDocument =
            serde_json::from_str(&text).map_err(|source| LabelError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_document(document)
    }

    fn to_document(&self) -> LabelsDocument {
        let skeleton = &self.skeleton;
        let links = skeleton
            .edges
            .iter()
            .filter_map(|(src, dst)| Some((skeleton.node_index(src)?, skeleton.node_index(dst)?)))
            .enumerate()
            .map(|(i, (source, target))| Link {
                source,
                target,
                key: 0,
                edge_insert_idx: i,
                edge_type: body_edge_type(),
            })
            .collect::<Vec<_>>();
        let graph = SkeletonGraph {
            directed: true,
            multigraph: true,
            graph: GraphAttrs {
                name: skeleton.name.clone(),
                num_edges_inserted: links.len(),
            },
            nodes: (0..skeleton.nodes.len()).map(|id| NodeId { id }).collect(),
            links,
        };

        let labels = self
            .labeled_frames
            .iter()
            .map(|frame| FrameEntry {
                video: frame.video,
                frame_idx: frame.frame_idx,
                instances: frame
                    .instances
                    .iter()
                    .map(|instance| InstanceEntry {
                        skeleton: 0,
                        track: None,
                        from_predicted: None,
                        points: instance
                            .points
                            .iter()
                            .enumerate()
                            .filter_map(|(node, point)| {
                                let p = (*point)?;
                                Some((
                                    node,
                                    PointEntry {
                                        x: p.x,
                                        y: p.y,
                                        visible: true,
                                        complete: true,
                                    },
                                ))
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        LabelsDocument {
            version: SLEAP_LABELS_VERSION.to_string(),
            skeletons: vec![graph],
            nodes: skeleton
                .nodes
                .iter()
                .map(|name| NodeEntry {
                    name: name.clone(),
                    weight: 1.0,
                })
                .collect(),
            videos: self
                .videos
                .iter()
                .map(|video| VideoEntry {
                    filename: video.filename.clone(),
                    backend: VideoBackend {
                        filename: video.filename.clone(),
                        grayscale: false,
                        bgr: true,
                        dataset: String::new(),
                        input_format: String::new(),
                    },
                })
                .collect(),
            tracks: Vec::new(),
            suggestions: self
                .labeled_frames
                .iter()
                .map(|frame| SuggestionEntry {
                    video: frame.video,
                    frame_idx: frame.frame_idx,
                    group: 0,
                })
                .collect(),
            negative_anchors: Map::new(),
            provenance: Provenance {
                suggestion_params: Some(self.suggestion_params.clone()),
            },
            labels,
        }
    }

    fn from_document(document: LabelsDocument) -> Result<Self, LabelError> {
        let graph = document.skeletons.first().ok_or(LabelError::NoSkeleton)?;
        let node_name = |index: usize| {
            document
                .nodes
                .get(index)
                .map(|node| node.name.clone())
                .ok_or(LabelError::NodeIndex {
                    index,
                    nodes: document.nodes.len(),
                })
        };

        let nodes = graph
            .nodes
            .iter()
            .map(|node| node_name(node.id))
            .collect::<Result<Vec<_>, _>>()?;
        let edges = graph
            .links
            .iter()
            .map(|link| Ok((node_name(link.source)?, node_name(link.target)?)))
            .collect::<Result<Vec<_>, LabelError>>()?;
        let skeleton = Skeleton {
            name: graph.graph.name.clone(),
            nodes,
            edges,
        };
        skeleton.validate()?;

        let mut labeled_frames = Vec::with_capacity(document.labels.len());
        for frame in &document.labels {
            let mut instances = Vec::with_capacity(frame.instances.len());
            for entry in &frame.instances {
                let mut instance = Instance::placeholder(&skeleton);
                for (&index, point) in &entry.points {
                    let name = node_name(index)?;
                    let slot = skeleton
                        .node_index(&name)
                        .ok_or(LabelError::UnknownNode(name))?;
                    instance.points[slot] = Some(Point2 {
                        x: point.x,
                        y: point.y,
                    });
                }
                instances.push(instance);
            }
            labeled_frames.push(LabeledFrame {
                video: frame.video,
                frame_idx: frame.frame_idx,
                instances,
            });
        }

        Ok(Self {
            skeleton,
            videos: document
                .videos
                .into_iter()
                .map(|video| VideoRef {
                    filename: video.filename,
                })
                .collect(),
            labeled_frames,
            suggestion_params: document.provenance.suggestion_params.unwrap_or_default(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SLEAP labels JSON layout
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct LabelsDocument {
    version: String,
    skeletons: Vec<SkeletonGraph>,
    nodes: Vec<NodeEntry>,
    videos: Vec<VideoEntry>,
    #[serde(default)]
    tracks: Vec<Value>,
    #[serde(default)]
    suggestions: Vec<SuggestionEntry>,
    #[serde(default)]
    negative_anchors: Map<String, Value>,
    #[serde(default)]
    provenance: Provenance,
    #[serde(default)]
    labels: Vec<FrameEntry>,
}

/// Skeleton as a node-link graph whose nodes are indices into `nodes`.
#[derive(Debug, Serialize, Deserialize)]
struct SkeletonGraph {
    directed: bool,
    multigraph: bool,
    graph: GraphAttrs,
    nodes: Vec<NodeId>,
    links: Vec<Link>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphAttrs {
    name: String,
    num_edges_inserted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeId {
    id: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct Link {
    source: usize,
    target: usize,
    key: usize,
    edge_insert_idx: usize,
    #[serde(rename = "type")]
    edge_type: Value,
}

/// SLEAP's pickled `EdgeType.BODY`.
fn body_edge_type() -> Value {
    json!({"py/reduce": [{"py/type": "sleap.skeleton.EdgeType"}, {"py/tuple": [1]}]})
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeEntry {
    name: String,
    weight: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct VideoEntry {
    filename: PathBuf,
    backend: VideoBackend,
}

#[derive(Debug, Serialize, Deserialize)]
struct VideoBackend {
    filename: PathBuf,
    grayscale: bool,
    bgr: bool,
    dataset: String,
    input_format: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SuggestionEntry {
    video: usize,
    frame_idx: usize,
    group: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suggestion_params: Option<SuggestionParams>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FrameEntry {
    video: usize,
    frame_idx: usize,
    instances: Vec<InstanceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InstanceEntry {
    skeleton: usize,
    track: Option<usize>,
    from_predicted: Option<Value>,
    /// Labeled points keyed by node index; unlabeled nodes are absent.
    #[serde(rename = "_points")]
    points: BTreeMap<usize, PointEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PointEntry {
    x: f64,
    y: f64,
    visible: bool,
    complete: bool,
}
