//! Builds the world graph from `<world>` markup.
//!
//! ```xml
//! <world>
//!   <group>
//!     <transform translation="1 0 0" rotation="0 0 0 1" scale="1 1 1">
//!       <model name="track" url="track.obj" textureFolder="textures"/>
//!       <shape name="ground">...</shape>
//!       <reference ref="track"/>
//!       <group>...</group>
//!     </transform>
//!   </group>
//! </world>
//! ```
//!
//! Models and shapes are registered by name in the [`ObjectRegistry`] and
//! placed where they are declared. A `<reference>` places an already
//! registered object again. A `<group>` adds its transforms to the node that
//! contains it.

use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::{
    data_structures::{
        object::Object,
        registry::{ObjectId, ObjectRegistry},
        scene_graph::WorldNode,
        texture::TextureRegistry,
    },
    error::LoadError,
    resources::{
        import::ObjectLoader,
        markup::{elements, name_attr, transform_attr, validate_world},
        shape::ShapeLoader,
        texture::resolve,
    },
};

/// Built-in world used when no environment file is configured.
pub const DEFAULT_WORLD: &str = include_str!("default_world.xml");

pub struct WorldLoader<'r> {
    objects: &'r mut ObjectRegistry,
    textures: &'r mut TextureRegistry,
}

impl<'r> WorldLoader<'r> {
    pub fn new(objects: &'r mut ObjectRegistry, textures: &'r mut TextureRegistry) -> Self {
        Self { objects, textures }
    }

    /// Loads the world file at `path`.
    ///
    /// An empty path selects [`DEFAULT_WORLD`]; a path that does not exist
    /// falls back to it with a warning.
    pub fn load_file(&mut self, path: &Path) -> Result<WorldNode, LoadError> {
        if path.as_os_str().is_empty() {
            return self.load_str(DEFAULT_WORLD, Path::new(""));
        }
        if !path.exists() {
            log::warn!(
                "The world file {:?} does not exist, using the default world.",
                path
            );
            return self.load_str(DEFAULT_WORLD, Path::new(""));
        }
        let markup = std::fs::read_to_string(path).map_err(|e| {
            log::error!("The world file {:?} could not be read: {}", path, e);
            LoadError::Io(e)
        })?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        self.load_str(&markup, base_dir)
    }

    /// Parses `markup`. Relative urls resolve against `base_dir`.
    ///
    /// Documents that do not parse or do not follow the world structure are
    /// rejected as a whole and nothing is registered.
    pub fn load_str(&mut self, markup: &str, base_dir: &Path) -> Result<WorldNode, LoadError> {
        let document = Document::parse(markup).map_err(|e| {
            log::error!("The world markup could not be parsed: {}", e);
            LoadError::Markup(e)
        })?;
        validate_world(&document).inspect_err(|e| {
            log::error!("The world markup is not valid: {}. Nothing is loaded.", e);
        })?;

        let mut root = WorldNode::root();
        if let Some(group) = elements(document.root_element()).next() {
            self.process_group(&group, &mut root, base_dir);
        }
        Ok(root)
    }

    fn process_group(&mut self, group: &Node, node: &mut WorldNode, base_dir: &Path) {
        for transform in elements(*group).filter(|e| e.tag_name().name() == "transform") {
            let child = self.process_transform(&transform, node, base_dir);
            node.add_child(child);
        }
    }

    fn process_transform(&mut self, transform: &Node, parent: &WorldNode, base_dir: &Path) -> WorldNode {
        let mut node = parent.child(transform_attr(transform));
        for element in elements(*transform) {
            let placed = match element.tag_name().name() {
                "group" => {
                    self.process_group(&element, &mut node, base_dir);
                    None
                }
                "model" => self.process_model(&element, base_dir),
                "shape" => self.process_shape(&element, base_dir),
                "reference" => self.process_reference(&element),
                _ => None,
            };
            if let Some(id) = placed {
                node.add_object(id);
            }
        }
        node
    }

    /// Name of a new object, or `None` when it is missing or already taken.
    fn new_object_name<'a>(&self, element: &Node<'a, '_>) -> Option<&'a str> {
        let tag = element.tag_name().name();
        let Some(name) = name_attr(element, "name") else {
            log::warn!(
                "The attribute 'name' of <{}> must be provided. The object will not be rendered.",
                tag
            );
            return None;
        };
        if self.objects.contains(name) {
            log::warn!(
                "An object named {:?} already exists. The <{}> will not be rendered.",
                name,
                tag
            );
            return None;
        }
        Some(name)
    }

    fn register(&mut self, name: &str, object: Object) -> Option<ObjectId> {
        self.objects.insert(name, object).ok()
    }

    fn process_model(&mut self, element: &Node, base_dir: &Path) -> Option<ObjectId> {
        let name = self.new_object_name(element)?;
        let url = element.attribute("url").unwrap_or_default();
        let texture_dir = match element.attribute("textureFolder") {
            Some(dir) if !dir.trim().is_empty() => resolve(base_dir, dir),
            _ => PathBuf::new(),
        };

        let loader = ObjectLoader::new(resolve(base_dir, url), texture_dir).with_name(name);
        match loader.build(self.textures) {
            Ok(object) => self.register(name, object),
            Err(e) => {
                log::warn!("Model {:?} from {:?} could not be built: {}", name, url, e);
                None
            }
        }
    }

    fn process_shape(&mut self, element: &Node, base_dir: &Path) -> Option<ObjectId> {
        let name = self.new_object_name(element)?;
        match ShapeLoader::new(*element)
            .with_base_dir(base_dir)
            .build(self.textures)
        {
            Ok(object) => self.register(name, object),
            Err(e) => {
                log::warn!("Shape {:?} could not be built: {}", name, e);
                None
            }
        }
    }

    fn process_reference(&self, element: &Node) -> Option<ObjectId> {
        let target = name_attr(element, "ref")?;
        let id = self.objects.id(target);
        if id.is_none() {
            log::warn!(
                "The referenced object {:?} does not exist. The reference will not be rendered.",
                target
            );
        }
        id
    }
}
