//! Haar cascade model and its reader.
//!
//! Reads the `opencv-cascade-classifier` XML layout written by
//! `opencv_traincascade` (and shipped as `haarcascade_*.xml`):
//!
//! ```text
//! <cascade>
//!   <stageType>BOOST</stageType> <featureType>HAAR</featureType>
//!   <height>24</height> <width>24</width>
//!   <stages>
//!     <_> <stageThreshold>..</stageThreshold>
//!         <weakClassifiers> <_> <internalNodes>..</internalNodes>
//!                               <leafValues>..</leafValues> </_> .. </weakClassifiers>
//!     </_> ..
//!   </stages>
//!   <features> <_> <rects> <_>x y w h weight</_> .. </rects> </_> .. </features>
//! </cascade>
//! ```

use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;

use crate::error::CascadeError;

/// One weighted rectangle of a Haar feature, in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaarRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<HaarRect>,
}

/// Split node of a weak classifier tree.
///
/// `left` and `right` point at another node when positive, or at leaf
/// `-index` when zero or negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f64>,
}

impl WeakClassifier {
    /// Walk the tree with `feature_value(index)` and return the reached leaf.
    pub fn predict(&self, mut feature_value: impl FnMut(usize) -> f64) -> f64 {
        let mut idx: i32 = 0;
        loop {
            let node = &self.nodes[idx as usize];
            idx = if feature_value(node.feature) < node.threshold {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return self.leaves[(-idx) as usize];
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub threshold: f64,
    pub classifiers: Vec<WeakClassifier>,
}

/// A boosted cascade of Haar-feature stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub window_width: u32,
    pub window_height: u32,
    pub stages: Vec<Stage>,
    pub features: Vec<HaarFeature>,
}

impl Cascade {
    /// Load a cascade from an OpenCV XML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CascadeError> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        Self::from_xml_str(&xml)
    }

    /// Parse a cascade from OpenCV XML text.
    pub fn from_xml_str(xml: &str) -> Result<Self, CascadeError> {
        let cascade = CascadeBuilder::parse(xml)?.build()?;
        cascade.check()?;
        Ok(cascade)
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    fn check(&self) -> Result<(), CascadeError> {
        if self.window_width < 3 || self.window_height < 3 {
            return Err(CascadeError::Invalid(format!(
                "window {}x{} is too small",
                self.window_width, self.window_height
            )));
        }
        if self.stages.is_empty() {
            return Err(CascadeError::Invalid("no stages".into()));
        }

        for (f_idx, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() || feature.rects.len() > 3 {
                return Err(CascadeError::Invalid(format!(
                    "feature {f_idx} has {} rectangles",
                    feature.rects.len()
                )));
            }
            for r in &feature.rects {
                if r.x + r.width > self.window_width || r.y + r.height > self.window_height {
                    return Err(CascadeError::Invalid(format!(
                        "feature {f_idx} leaves the detection window"
                    )));
                }
            }
        }

        for (s_idx, stage) in self.stages.iter().enumerate() {
            if stage.classifiers.is_empty() {
                return Err(CascadeError::Invalid(format!("stage {s_idx} is empty")));
            }
            for classifier in &stage.classifiers {
                let n_nodes = classifier.nodes.len() as i32;
                let n_leaves = classifier.leaves.len() as i32;
                for (n_idx, node) in classifier.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        return Err(CascadeError::Invalid(format!(
                            "stage {s_idx} references feature {} of {}",
                            node.feature,
                            self.features.len()
                        )));
                    }
                    for child in [node.left, node.right] {
                        let in_range = if child > 0 {
                            child < n_nodes
                        } else {
                            -child < n_leaves
                        };
                        if !in_range {
                            return Err(CascadeError::Invalid(format!(
                                "stage {s_idx} has a dangling tree link {child}"
                            )));
                        }
                        // trees are stored root first, so links only point forward
                        if child > 0 && child as usize <= n_idx {
                            return Err(CascadeError::Invalid(format!(
                                "stage {s_idx} node {n_idx} links back to node {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct ClassifierBuilder {
    nodes: Option<Vec<TreeNode>>,
    leaves: Option<Vec<f64>>,
}

#[derive(Default)]
struct StageBuilder {
    threshold: Option<f64>,
    classifiers: Vec<WeakClassifier>,
}

#[derive(Default)]
struct CascadeBuilder {
    seen_cascade: bool,
    stage_type: Option<String>,
    feature_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
    stage: Option<StageBuilder>,
    classifier: Option<ClassifierBuilder>,
    feature: Option<HaarFeature>,
}

impl CascadeBuilder {
    fn parse(xml: &str) -> Result<Self, CascadeError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut builder = Self::default();
        let mut stack: Vec<String> = Vec::new();
        let mut text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"type_id"
                            && attr.value.as_ref() == b"opencv-haar-classifier"
                        {
                            return Err(CascadeError::Unsupported(
                                "legacy opencv-haar-classifier layout".into(),
                            ));
                        }
                    }
                    stack.push(name);
                    text.clear();
                    builder.open(&stack);
                }
                Ok(Event::Text(e)) => {
                    let chunk = e.unescape().map_err(|e| CascadeError::Xml(e.to_string()))?;
                    text.push_str(&chunk);
                }
                Ok(Event::End(_)) => {
                    builder.close(&stack, text.trim())?;
                    text.clear();
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(CascadeError::Xml(e.to_string())),
            }
        }

        if !builder.seen_cascade {
            return Err(CascadeError::missing("cascade", "document"));
        }
        Ok(builder)
    }

    /// Element path below `<cascade>`, or None outside it.
    fn rel<'a>(stack: &'a [String]) -> Option<Vec<&'a str>> {
        let pos = stack.iter().position(|s| s == "cascade")?;
        Some(stack[pos + 1..].iter().map(String::as_str).collect())
    }

    fn open(&mut self, stack: &[String]) {
        let Some(path) = Self::rel(stack) else {
            return;
        };
        match path.as_slice() {
            [] => self.seen_cascade = true,
            ["stages", "_"] => self.stage = Some(StageBuilder::default()),
            ["stages", "_", "weakClassifiers", "_"] => {
                self.classifier = Some(ClassifierBuilder::default())
            }
            ["features", "_"] => self.feature = Some(HaarFeature { rects: Vec::new() }),
            _ => {}
        }
    }

    fn close(&mut self, stack: &[String], text: &str) -> Result<(), CascadeError> {
        let Some(path) = Self::rel(stack) else {
            return Ok(());
        };
        match path.as_slice() {
            ["stageType"] => self.stage_type = Some(text.to_string()),
            ["featureType"] => self.feature_type = Some(text.to_string()),
            ["width"] => self.width = Some(parse_one(text, "width")?),
            ["height"] => self.height = Some(parse_one(text, "height")?),
            ["stages", "_", "stageThreshold"] => {
                if let Some(stage) = self.stage.as_mut() {
                    stage.threshold = Some(parse_one(text, "stageThreshold")?);
                }
            }
            ["stages", "_", "weakClassifiers", "_", "internalNodes"] => {
                if let Some(classifier) = self.classifier.as_mut() {
                    classifier.nodes = Some(parse_nodes(text)?);
                }
            }
            ["stages", "_", "weakClassifiers", "_", "leafValues"] => {
                if let Some(classifier) = self.classifier.as_mut() {
                    classifier.leaves = Some(parse_list(text, "leafValues")?);
                }
            }
            ["stages", "_", "weakClassifiers", "_"] => {
                let classifier = self.classifier.take().unwrap_or_default();
                let nodes = classifier
                    .nodes
                    .ok_or(CascadeError::missing("internalNodes", "weak classifier"))?;
                let leaves = classifier
                    .leaves
                    .ok_or(CascadeError::missing("leafValues", "weak classifier"))?;
                if let Some(stage) = self.stage.as_mut() {
                    stage.classifiers.push(WeakClassifier { nodes, leaves });
                }
            }
            ["stages", "_"] => {
                let stage = self.stage.take().unwrap_or_default();
                let threshold = stage
                    .threshold
                    .ok_or(CascadeError::missing("stageThreshold", "stage"))?;
                self.stages.push(Stage {
                    threshold,
                    classifiers: stage.classifiers,
                });
            }
            ["features", "_", "rects", "_"] => {
                let values: Vec<f64> = parse_list(text, "rects")?;
                let [x, y, width, height, weight] = values.as_slice() else {
                    return Err(CascadeError::InvalidNumber {
                        element: "rects",
                        value: text.to_string(),
                    });
                };
                if let Some(feature) = self.feature.as_mut() {
                    feature.rects.push(HaarRect {
                        x: to_coord(*x, text)?,
                        y: to_coord(*y, text)?,
                        width: to_coord(*width, text)?,
                        height: to_coord(*height, text)?,
                        weight: *weight,
                    });
                }
            }
            ["features", "_", "tilted"] => {
                if parse_one::<i32>(text, "tilted")? != 0 {
                    return Err(CascadeError::Unsupported("tilted Haar features".into()));
                }
            }
            ["features", "_"] => {
                if let Some(feature) = self.feature.take() {
                    self.features.push(feature);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Result<Cascade, CascadeError> {
        match self.stage_type.as_deref() {
            Some("BOOST") => {}
            Some(other) => return Err(CascadeError::Unsupported(format!("stage type {other}"))),
            None => return Err(CascadeError::missing("stageType", "cascade")),
        }
        match self.feature_type.as_deref() {
            Some("HAAR") => {}
            Some(other) => {
                return Err(CascadeError::Unsupported(format!("feature type {other}")));
            }
            None => return Err(CascadeError::missing("featureType", "cascade")),
        }

        Ok(Cascade {
            window_width: self.width.ok_or(CascadeError::missing("width", "cascade"))?,
            window_height: self.height.ok_or(CascadeError::missing("height", "cascade"))?,
            stages: self.stages,
            features: self.features,
        })
    }
}

fn parse_one<T: std::str::FromStr>(text: &str, element: &'static str) -> Result<T, CascadeError> {
    text.trim().parse().map_err(|_| CascadeError::InvalidNumber {
        element,
        value: text.to_string(),
    })
}

fn parse_list<T: std::str::FromStr>(
    text: &str,
    element: &'static str,
) -> Result<Vec<T>, CascadeError> {
    text.split_whitespace()
        .map(|token| parse_one(token, element))
        .collect()
}

fn parse_nodes(text: &str) -> Result<Vec<TreeNode>, CascadeError> {
    let values: Vec<f64> = parse_list(text, "internalNodes")?;
    if values.is_empty() || values.len() % 4 != 0 {
        return Err(CascadeError::InvalidNumber {
            element: "internalNodes",
            value: text.to_string(),
        });
    }
    let invalid = || CascadeError::InvalidNumber {
        element: "internalNodes",
        value: text.to_string(),
    };
    values
        .chunks_exact(4)
        .map(|chunk| {
            if chunk[2] < 0.0 || chunk[..3].iter().any(|v| v.fract() != 0.0) {
                return Err(invalid());
            }
            Ok(TreeNode {
                left: chunk[0] as i32,
                right: chunk[1] as i32,
                feature: chunk[2] as usize,
                threshold: chunk[3],
            })
        })
        .collect()
}

fn to_coord(value: f64, text: &str) -> Result<u32, CascadeError> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(CascadeError::InvalidNumber {
            element: "rects",
            value: text.to_string(),
        });
    }
    Ok(value as u32)
}
