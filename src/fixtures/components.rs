//! The benchmarked tree: `x-app` renders one `x-item` per record, each
//! `x-item` renders six `x-thing` leaves.

use super::{Dataset, Datasets, Record};
use crate::component::{
    Component, ComponentError, ComponentRuntime, PropValue, PropertyDeclaration, PropertyMap,
    Template, UpdateError,
};
use std::rc::Rc;

pub const X_THING: &str = "x-thing";
pub const X_ITEM: &str = "x-item";
pub const X_APP: &str = "x-app";

/// Leaves rendered by each `x-item`.
pub const THINGS_PER_ITEM: usize = 6;

fn text_prop(props: &PropertyMap, name: &str) -> Rc<str> {
    props
        .get(name)
        .and_then(PropValue::as_text)
        .cloned()
        .unwrap_or_else(|| Rc::from(""))
}

/// Display leaf. Its properties reflect to attributes whenever the shared
/// reflect switch is on.
#[derive(Debug, Default)]
pub struct XThing;

impl XThing {
    const PROPERTIES: [PropertyDeclaration; 3] = [
        PropertyDeclaration::shared("from"),
        PropertyDeclaration::shared("time"),
        PropertyDeclaration::shared("subject"),
    ];
}

impl Component for XThing {
    fn tag_name(&self) -> &'static str {
        X_THING
    }

    fn properties(&self) -> &'static [PropertyDeclaration] {
        &Self::PROPERTIES
    }

    fn defaults(&self) -> Vec<(&'static str, PropValue)> {
        Self::PROPERTIES
            .iter()
            .map(|decl| (decl.name, PropValue::text("")))
            .collect()
    }

    fn render(&self, props: &PropertyMap) -> Result<Template, UpdateError> {
        Ok(Template::with_capacity(3)
            .text("span", "from", text_prop(props, "from"))
            .text("span", "time", text_prop(props, "time"))
            .text("div", "subject", text_prop(props, "subject")))
    }
}

/// Row of six leaves fed from the first eighteen fields of its record.
#[derive(Debug, Default)]
pub struct XItem;

impl XItem {
    const PROPERTIES: [PropertyDeclaration; 1] = [PropertyDeclaration::new("item")];

    fn field(record: &Record, index: usize) -> PropValue {
        PropValue::text(record.field(index).unwrap_or_default())
    }
}

impl Component for XItem {
    fn tag_name(&self) -> &'static str {
        X_ITEM
    }

    fn properties(&self) -> &'static [PropertyDeclaration] {
        &Self::PROPERTIES
    }

    fn render(&self, props: &PropertyMap) -> Result<Template, UpdateError> {
        let record = props
            .get("item")
            .and_then(PropValue::as_record)
            .ok_or_else(|| UpdateError::Render {
                tag: X_ITEM.to_string(),
                reason: "property 'item' is not set".to_string(),
            })?;

        let template = (0..THINGS_PER_ITEM).fold(
            Template::with_capacity(THINGS_PER_ITEM),
            |template, thing| {
                let base = thing * 3;
                template.child(
                    X_THING,
                    [
                        ("from", Self::field(record, base)),
                        ("time", Self::field(record, base + 1)),
                        ("subject", Self::field(record, base + 2)),
                    ],
                )
            },
        );
        Ok(template)
    }
}

/// Root list. Starts out showing `data`.
#[derive(Debug)]
pub struct XApp {
    initial: Dataset,
}

impl XApp {
    const PROPERTIES: [PropertyDeclaration; 1] = [PropertyDeclaration::new("items")];

    pub fn new(initial: Dataset) -> Self {
        Self { initial }
    }
}

impl Component for XApp {
    fn tag_name(&self) -> &'static str {
        X_APP
    }

    fn properties(&self) -> &'static [PropertyDeclaration] {
        &Self::PROPERTIES
    }

    fn defaults(&self) -> Vec<(&'static str, PropValue)> {
        vec![("items", PropValue::List(self.initial.clone()))]
    }

    fn render(&self, props: &PropertyMap) -> Result<Template, UpdateError> {
        let items = props
            .get("items")
            .and_then(PropValue::as_list)
            .ok_or_else(|| UpdateError::Render {
                tag: X_APP.to_string(),
                reason: "property 'items' is not a list".to_string(),
            })?;

        Ok(items.iter().fold(Template::with_capacity(items.len()), |template, record| {
            template.child(X_ITEM, [("item", PropValue::Record(record.clone()))])
        }))
    }
}

/// Registers `x-thing`, `x-item` and `x-app` with `runtime`.
pub fn define_components(runtime: &ComponentRuntime, datasets: &Datasets) -> Result<(), ComponentError> {
    runtime.define(X_THING, || Box::new(XThing))?;
    runtime.define(X_ITEM, || Box::new(XItem))?;
    let data = datasets.data.clone();
    runtime.define(X_APP, move || Box::new(XApp::new(data.clone())))?;
    Ok(())
}
