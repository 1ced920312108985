//! ISO 19139 XML encoding of [`IsoRecord`].
//!
//! Serialization builds a small element tree and writes it with quick-xml;
//! parsing reads any document into the same tree, which the validator
//! also walks. Element names keep their literal prefixes (`gmd:title`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use super::record::{
    BoundingBox, ContactInfo, DataQuality, Distribution, Extent, HierarchyLevel, Identification,
    IsoRecord, MetadataStandard, ProgressStatus, SpatialRepresentationType, TemporalExtent,
};
use crate::error::{TeamflowError, TeamflowResult};

pub const GMD_NS: &str = "http://www.isotc211.org/2005/gmd";
pub const GCO_NS: &str = "http://www.isotc211.org/2005/gco";
pub const GML_NS: &str = "http://www.opengis.net/gml/3.2";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const CODELISTS: &str = "http://standards.iso.org/iso/19139/resources/gmxCodelists.xml";
const SCHEMA_LOCATION: &str =
    "http://www.isotc211.org/2005/gmd http://schemas.opengis.net/iso/19139/20070417/gmd/gmd.xsd";

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Minimal DOM: name, attributes, text and children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with this name
    pub fn get(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with this name
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a path of direct child names
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names.iter().try_fold(self, |node, name| node.get(name))
    }

    /// Depth-first search for a descendant (including self)
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Own text, or the first non-empty text below this element.
    /// `<gmd:title><gco:CharacterString>T</gco:CharacterString></gmd:title>` → `T`
    pub fn value(&self) -> Option<&str> {
        let own = self.text.trim();
        if !own.is_empty() {
            return Some(own);
        }
        self.children.iter().find_map(|c| c.value())
    }

    /// `codeListValue` of the first code element below this one, else its text
    pub fn code_value(&self) -> Option<&str> {
        if let Some(v) = self.attribute("codeListValue").filter(|v| !v.is_empty()) {
            return Some(v);
        }
        self.children
            .iter()
            .find_map(|c| c.code_value())
            .or_else(|| self.value())
    }
}

fn character_string(name: &str, value: &str) -> XmlElement {
    XmlElement::new(name).child(XmlElement::new("gco:CharacterString").text(value))
}

fn code(name: &str, code_type: &str, value: &str) -> XmlElement {
    XmlElement::new(name).child(
        XmlElement::new(format!("gmd:{}", code_type))
            .attr("codeList", format!("{}#{}", CODELISTS, code_type))
            .attr("codeListValue", value)
            .text(value),
    )
}

fn decimal(name: &str, value: f64) -> XmlElement {
    XmlElement::new(name).child(XmlElement::new("gco:Decimal").text(format_decimal(value)))
}

/// Locale-free decimal: integral values keep one fractional digit (`-10.0`)
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn contact_element(contact: &ContactInfo) -> XmlElement {
    let mut party = XmlElement::new("gmd:CI_ResponsibleParty");
    if let Some(individual) = &contact.individual {
        party = party.child(character_string("gmd:individualName", individual));
    }
    party = party.child(character_string("gmd:organisationName", &contact.organisation));
    if let Some(email) = &contact.email {
        party = party.child(
            XmlElement::new("gmd:contactInfo").child(
                XmlElement::new("gmd:CI_Contact").child(
                    XmlElement::new("gmd:address").child(
                        XmlElement::new("gmd:CI_Address")
                            .child(character_string("gmd:electronicMailAddress", email)),
                    ),
                ),
            ),
        );
    }
    party = party.child(code("gmd:role", "CI_RoleCode", &contact.role));
    XmlElement::new("gmd:contact").child(party)
}

fn extent_element(extent: &Extent) -> XmlElement {
    let bbox = &extent.geographic_bbox;
    let mut ex = XmlElement::new("gmd:EX_Extent").child(
        XmlElement::new("gmd:geographicElement").child(
            XmlElement::new("gmd:EX_GeographicBoundingBox").children([
                decimal("gmd:westBoundLongitude", bbox.west),
                decimal("gmd:eastBoundLongitude", bbox.east),
                decimal("gmd:southBoundLatitude", bbox.south),
                decimal("gmd:northBoundLatitude", bbox.north),
            ]),
        ),
    );
    if let Some(temporal) = &extent.temporal {
        ex = ex.child(
            XmlElement::new("gmd:temporalElement").child(
                XmlElement::new("gmd:EX_TemporalExtent").child(
                    XmlElement::new("gmd:extent").child(
                        XmlElement::new("gml:TimePeriod")
                            .attr("gml:id", "temporal-extent")
                            .child(
                                XmlElement::new("gml:beginPosition")
                                    .text(temporal.start.format("%Y-%m-%d").to_string()),
                            )
                            .child(
                                XmlElement::new("gml:endPosition")
                                    .text(temporal.end.format("%Y-%m-%d").to_string()),
                            ),
                    ),
                ),
            ),
        );
    }
    XmlElement::new("gmd:extent").child(ex)
}

fn identification_element(id: &Identification) -> XmlElement {
    let citation = XmlElement::new("gmd:citation").child(
        XmlElement::new("gmd:CI_Citation")
            .child(character_string("gmd:title", &id.title))
            .child(
                XmlElement::new("gmd:date").child(
                    XmlElement::new("gmd:CI_Date")
                        .child(XmlElement::new("gmd:date").child(
                            XmlElement::new("gco:Date").text(id.citation_date.format("%Y-%m-%d").to_string()),
                        ))
                        .child(code("gmd:dateType", "CI_DateTypeCode", "creation")),
                ),
            ),
    );

    let mut data_id = XmlElement::new("gmd:MD_DataIdentification")
        .child(citation)
        .child(character_string("gmd:abstract", &id.abstract_text))
        .child(character_string("gmd:purpose", &id.purpose))
        .child(code("gmd:status", "MD_ProgressCode", id.status.code()));

    if !id.keywords.is_empty() {
        data_id = data_id.child(
            XmlElement::new("gmd:descriptiveKeywords").child(
                XmlElement::new("gmd:MD_Keywords")
                    .children(id.keywords.iter().map(|k| character_string("gmd:keyword", k))),
            ),
        );
    }

    for constraint in &id.constraints {
        data_id = data_id.child(
            XmlElement::new("gmd:resourceConstraints").child(
                XmlElement::new("gmd:MD_LegalConstraints")
                    .child(character_string("gmd:otherConstraints", constraint)),
            ),
        );
    }

    data_id = data_id.child(code(
        "gmd:spatialRepresentationType",
        "MD_SpatialRepresentationTypeCode",
        id.spatial_rep_type.code(),
    ));

    if let Some(resolution) = id.spatial_resolution {
        data_id = data_id.child(
            XmlElement::new("gmd:spatialResolution").child(
                XmlElement::new("gmd:MD_Resolution").child(
                    XmlElement::new("gmd:distance").child(
                        XmlElement::new("gco:Distance")
                            .attr("uom", "m")
                            .text(format_decimal(resolution)),
                    ),
                ),
            ),
        );
    }

    data_id
        .child(character_string("gmd:language", &id.language))
        .child(code("gmd:characterSet", "MD_CharacterSetCode", &id.character_set))
        .child(
            XmlElement::new("gmd:topicCategory")
                .child(XmlElement::new("gmd:MD_TopicCategoryCode").text(id.topic_category.as_str())),
        )
        .child(extent_element(&id.extent))
}

fn distribution_element(distribution: &Distribution) -> XmlElement {
    let mut md = XmlElement::new("gmd:MD_Distribution").child(
        XmlElement::new("gmd:distributionFormat").child(
            XmlElement::new("gmd:MD_Format")
                .child(character_string("gmd:name", &distribution.format_name))
                .child(character_string("gmd:version", &distribution.format_version)),
        ),
    );
    if let Some(url) = &distribution.online_resource {
        md = md.child(
            XmlElement::new("gmd:transferOptions").child(
                XmlElement::new("gmd:MD_DigitalTransferOptions").child(
                    XmlElement::new("gmd:onLine").child(
                        XmlElement::new("gmd:CI_OnlineResource").child(
                            XmlElement::new("gmd:linkage").child(XmlElement::new("gmd:URL").text(url.as_str())),
                        ),
                    ),
                ),
            ),
        );
    }
    XmlElement::new("gmd:distributionInfo").child(md)
}

fn data_quality_element(dq: &DataQuality) -> XmlElement {
    XmlElement::new("gmd:dataQualityInfo").child(
        XmlElement::new("gmd:DQ_DataQuality")
            .child(
                XmlElement::new("gmd:scope").child(
                    XmlElement::new("gmd:DQ_Scope").child(code("gmd:level", "MD_ScopeCode", dq.scope.code())),
                ),
            )
            .child(
                XmlElement::new("gmd:lineage").child(
                    XmlElement::new("gmd:LI_Lineage").child(character_string("gmd:statement", &dq.lineage)),
                ),
            ),
    )
}

/// Record → element tree, in ISO 19139 element order
pub fn to_element(record: &IsoRecord) -> XmlElement {
    let mut root = XmlElement::new("gmd:MD_Metadata")
        .attr("xmlns:gmd", GMD_NS)
        .attr("xmlns:gco", GCO_NS)
        .attr("xmlns:gml", GML_NS)
        .attr("xmlns:xsi", XSI_NS)
        .attr("xsi:schemaLocation", SCHEMA_LOCATION)
        .child(character_string("gmd:fileIdentifier", &record.file_identifier.to_string()))
        .child(character_string("gmd:language", &record.language))
        .child(code("gmd:characterSet", "MD_CharacterSetCode", &record.character_set))
        .child(code("gmd:hierarchyLevel", "MD_ScopeCode", record.hierarchy_level.code()));

    if let Some(contact) = &record.contact {
        root = root.child(contact_element(contact));
    }

    root = root
        .child(
            XmlElement::new("gmd:dateStamp").child(
                XmlElement::new("gco:DateTime").text(record.date_stamp.format(DATE_TIME_FORMAT).to_string()),
            ),
        )
        .child(character_string("gmd:metadataStandardName", &record.metadata_standard.name))
        .child(character_string(
            "gmd:metadataStandardVersion",
            &record.metadata_standard.version,
        ))
        .child(XmlElement::new("gmd:identificationInfo").child(identification_element(&record.identification)));

    if let Some(distribution) = &record.distribution {
        root = root.child(distribution_element(distribution));
    }
    if let Some(dq) = &record.data_quality {
        root = root.child(data_quality_element(dq));
    }
    root
}

fn write_error(e: impl std::fmt::Display) -> TeamflowError {
    TeamflowError::InternalInvariant(format!("XML write failed: {}", e))
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> TeamflowResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(write_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

/// UTF-8 XML document for a record
pub fn serialize(record: &IsoRecord) -> TeamflowResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_element(&mut writer, &to_element(record))?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse any XML document into an element tree
pub fn parse_tree(bytes: &[u8]) -> Result<XmlElement, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("document is not UTF-8: {}", e))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    fn open(e: &BytesStart<'_>) -> Result<XmlElement, String> {
        let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        for attr in e.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            element
                .attributes
                .push((String::from_utf8_lossy(attr.key.as_ref()).into_owned(), value.into_owned()));
        }
        Ok(element)
    }

    fn close(element: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) -> Result<(), String> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => return Err("document has more than one root element".to_string()),
        }
        Ok(())
    }

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {}", reader.buffer_position(), e))?;
        match event {
            Event::Start(e) => stack.push(open(&e)?),
            Event::Empty(e) => {
                let element = open(&e)?;
                close(element, &mut stack, &mut root)?;
            }
            Event::End(e) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                if element.name.as_bytes() != e.name().as_ref() {
                    return Err(format!(
                        "mismatched closing tag </{}> for <{}>",
                        String::from_utf8_lossy(e.name().as_ref()),
                        element.name
                    ));
                }
                close(element, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!("unclosed element <{}>", stack[stack.len() - 1].name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn required<'a>(node: &'a XmlElement, path: &[&str], what: &str) -> TeamflowResult<&'a str> {
    node.path(path)
        .and_then(|n| n.value())
        .ok_or_else(|| TeamflowError::InputInvalid(format!("metadata is missing {}", what)))
}

fn optional_value(node: &XmlElement, path: &[&str]) -> Option<String> {
    node.path(path).and_then(|n| n.value()).map(str::to_string)
}

fn parse_f64(node: &XmlElement, name: &str) -> TeamflowResult<f64> {
    let raw = required(node, &[name], name)?;
    raw.parse::<f64>()
        .map_err(|_| TeamflowError::InputInvalid(format!("{} is not a number: {}", name, raw)))
}

fn parse_date(raw: &str, what: &str) -> TeamflowResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d")
        .map_err(|_| TeamflowError::InputInvalid(format!("{} is not an ISO 8601 date: {}", what, raw)))
}

/// Accepts `gco:DateTime` (with or without `Z`) or a bare `gco:Date`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_contact(node: &XmlElement) -> Option<ContactInfo> {
    let party = node.get("gmd:CI_ResponsibleParty")?;
    Some(ContactInfo {
        organisation: optional_value(party, &["gmd:organisationName"]).unwrap_or_default(),
        individual: optional_value(party, &["gmd:individualName"]),
        email: party
            .find("gmd:electronicMailAddress")
            .and_then(|n| n.value())
            .map(str::to_string),
        role: party
            .get("gmd:role")
            .and_then(|n| n.code_value())
            .unwrap_or("pointOfContact")
            .to_string(),
    })
}

fn parse_identification(info: &XmlElement) -> TeamflowResult<Identification> {
    let data_id = info
        .children
        .first()
        .ok_or_else(|| TeamflowError::InputInvalid("empty gmd:identificationInfo".to_string()))?;

    let title = required(data_id, &["gmd:citation", "gmd:CI_Citation", "gmd:title"], "gmd:title")?;
    let abstract_text = required(data_id, &["gmd:abstract"], "gmd:abstract")?;

    let extent_node = data_id
        .path(&["gmd:extent", "gmd:EX_Extent"])
        .ok_or_else(|| TeamflowError::InputInvalid("metadata is missing gmd:extent".to_string()))?;
    let bbox_node = extent_node
        .find("gmd:EX_GeographicBoundingBox")
        .ok_or_else(|| TeamflowError::InputInvalid("metadata is missing a bounding box".to_string()))?;
    let geographic_bbox = BoundingBox {
        west: parse_f64(bbox_node, "gmd:westBoundLongitude")?,
        east: parse_f64(bbox_node, "gmd:eastBoundLongitude")?,
        south: parse_f64(bbox_node, "gmd:southBoundLatitude")?,
        north: parse_f64(bbox_node, "gmd:northBoundLatitude")?,
    };
    let temporal = match extent_node.find("gml:TimePeriod") {
        Some(period) => Some(TemporalExtent {
            start: parse_date(required(period, &["gml:beginPosition"], "gml:beginPosition")?, "beginPosition")?,
            end: parse_date(required(period, &["gml:endPosition"], "gml:endPosition")?, "endPosition")?,
        }),
        None => None,
    };

    let keywords: BTreeSet<String> = data_id
        .get_all("gmd:descriptiveKeywords")
        .flat_map(|dk| dk.children.iter())
        .flat_map(|kw| kw.get_all("gmd:keyword"))
        .filter_map(|k| k.value())
        .map(str::to_string)
        .collect();

    let constraints = data_id
        .get_all("gmd:resourceConstraints")
        .filter_map(|c| c.find("gmd:otherConstraints").or_else(|| c.find("gmd:useLimitation")))
        .filter_map(|c| c.value())
        .map(str::to_string)
        .collect();

    let citation_date = data_id
        .path(&["gmd:citation", "gmd:CI_Citation", "gmd:date", "gmd:CI_Date", "gmd:date"])
        .and_then(|n| n.value())
        .and_then(|raw| parse_date(raw, "citation date").ok())
        .unwrap_or_default();

    Ok(Identification {
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
        purpose: optional_value(data_id, &["gmd:purpose"]).unwrap_or_default(),
        status: data_id
            .get("gmd:status")
            .and_then(|n| n.code_value())
            .map(ProgressStatus::from_str)
            .transpose()?
            .unwrap_or_default(),
        keywords,
        constraints,
        spatial_rep_type: data_id
            .get("gmd:spatialRepresentationType")
            .and_then(|n| n.code_value())
            .map(SpatialRepresentationType::from_str)
            .transpose()?
            .unwrap_or_default(),
        spatial_resolution: data_id
            .find("gco:Distance")
            .and_then(|n| n.value())
            .and_then(|v| v.parse::<f64>().ok()),
        language: optional_value(data_id, &["gmd:language"]).unwrap_or_default(),
        character_set: data_id
            .get("gmd:characterSet")
            .and_then(|n| n.code_value())
            .unwrap_or_default()
            .to_string(),
        topic_category: optional_value(data_id, &["gmd:topicCategory"]).unwrap_or_default(),
        citation_date,
        extent: Extent {
            geographic_bbox,
            temporal,
        },
    })
}

/// XML document → record. Fails with `InputInvalid` when a required
/// element is missing or malformed.
pub fn parse(bytes: &[u8]) -> TeamflowResult<IsoRecord> {
    let root = parse_tree(bytes).map_err(TeamflowError::InputInvalid)?;
    if root.name != "gmd:MD_Metadata" {
        return Err(TeamflowError::InputInvalid(format!(
            "root element is <{}>, expected <gmd:MD_Metadata>",
            root.name
        )));
    }

    let file_identifier = required(&root, &["gmd:fileIdentifier"], "gmd:fileIdentifier")?;
    let file_identifier = Uuid::parse_str(file_identifier).map_err(|_| {
        TeamflowError::InputInvalid(format!("fileIdentifier is not a UUID: {}", file_identifier))
    })?;

    let date_stamp_raw = required(&root, &["gmd:dateStamp"], "gmd:dateStamp")?;
    let date_stamp = parse_timestamp(date_stamp_raw).ok_or_else(|| {
        TeamflowError::InputInvalid(format!("dateStamp is not ISO 8601: {}", date_stamp_raw))
    })?;

    let hierarchy_level = root
        .get("gmd:hierarchyLevel")
        .and_then(|n| n.code_value())
        .ok_or_else(|| TeamflowError::InputInvalid("metadata is missing gmd:hierarchyLevel".to_string()))?
        .parse::<HierarchyLevel>()?;

    let identification = parse_identification(
        root.get("gmd:identificationInfo")
            .ok_or_else(|| TeamflowError::InputInvalid("metadata is missing gmd:identificationInfo".to_string()))?,
    )?;

    let distribution = root.get("gmd:distributionInfo").map(|info| Distribution {
        format_name: info
            .find("gmd:MD_Format")
            .and_then(|f| optional_value(f, &["gmd:name"]))
            .unwrap_or_default(),
        format_version: info
            .find("gmd:MD_Format")
            .and_then(|f| optional_value(f, &["gmd:version"]))
            .unwrap_or_default(),
        online_resource: info.find("gmd:URL").and_then(|n| n.value()).map(str::to_string),
    });

    let data_quality = root.get("gmd:dataQualityInfo").map(|info| DataQuality {
        scope: info
            .find("gmd:level")
            .and_then(|n| n.code_value())
            .and_then(|v| v.parse::<HierarchyLevel>().ok())
            .unwrap_or_default(),
        lineage: info
            .find("gmd:statement")
            .and_then(|n| n.value())
            .unwrap_or_default()
            .to_string(),
    });

    Ok(IsoRecord {
        file_identifier,
        language: required(&root, &["gmd:language"], "gmd:language")?.to_string(),
        character_set: root
            .get("gmd:characterSet")
            .and_then(|n| n.code_value())
            .ok_or_else(|| TeamflowError::InputInvalid("metadata is missing gmd:characterSet".to_string()))?
            .to_string(),
        hierarchy_level,
        contact: root.get("gmd:contact").and_then(parse_contact),
        date_stamp,
        metadata_standard: MetadataStandard {
            name: required(&root, &["gmd:metadataStandardName"], "gmd:metadataStandardName")?.to_string(),
            version: required(&root, &["gmd:metadataStandardVersion"], "gmd:metadataStandardVersion")?
                .to_string(),
        },
        identification,
        distribution,
        data_quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso19115::builder::{FixedClock, FixedId, MetadataBuilder, MetadataParams};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn builder() -> MetadataBuilder {
        MetadataBuilder::new()
            .with_clock(Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).unwrap(),
            )))
            .with_ids(Arc::new(FixedId(
                Uuid::parse_str("6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b").unwrap(),
            )))
    }

    fn full_params() -> MetadataParams {
        let json = r#"{
            "title": "Coastal flood extents",
            "abstract": "Modelled 1-in-100 year flood extents & depths",
            "keywords": ["flood", "coast"],
            "spatial_extent": {"west": -10.0, "east": 10.0, "south": -5.0, "north": 5.0},
            "temporal_extent": {"start": "2024-01-01", "end": "2024-06-30"},
            "data_type": "raster",
            "contact": {"organisation": "Environment Agency", "email": "gis@example.org"},
            "resolution": 2.5,
            "lineage": "Hydraulic model run v3",
            "constraints": ["Open Government Licence"],
            "online_resource": "https://data.example/flood.tif"
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_decimal_formatting() {
        assert_eq!(format_decimal(-10.0), "-10.0");
        assert_eq!(format_decimal(5.0), "5.0");
        assert_eq!(format_decimal(-0.125), "-0.125");
        assert_eq!(format_decimal(179.999999), "179.999999");
    }

    #[test]
    fn test_namespaces_and_codelists() {
        let record = builder().build(&full_params()).unwrap();
        let xml = String::from_utf8(serialize(&record).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"xmlns:gmd="http://www.isotc211.org/2005/gmd""#));
        assert!(xml.contains(r#"xmlns:gco="http://www.isotc211.org/2005/gco""#));
        assert!(xml.contains(r#"xmlns:gml="http://www.opengis.net/gml/3.2""#));
        assert!(xml.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
        assert!(xml.contains("gmxCodelists.xml#MD_ScopeCode"));
        assert!(xml.contains("<gco:Decimal>-10.0</gco:Decimal>"));
        assert!(xml.contains("&amp; depths"));
    }

    #[test]
    fn test_round_trip_preserves_record() {
        let record = builder().build(&full_params()).unwrap();
        let parsed = parse(&serialize(&record).unwrap()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let a = serialize(&builder().build(&full_params()).unwrap()).unwrap();
        let b = serialize(&builder().build(&full_params()).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_element_order_follows_skeleton() {
        let record = builder().build(&full_params()).unwrap();
        let tree = parse_tree(&serialize(&record).unwrap()).unwrap();
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "gmd:fileIdentifier",
                "gmd:language",
                "gmd:characterSet",
                "gmd:hierarchyLevel",
                "gmd:contact",
                "gmd:dateStamp",
                "gmd:metadataStandardName",
                "gmd:metadataStandardVersion",
                "gmd:identificationInfo",
                "gmd:distributionInfo",
                "gmd:dataQualityInfo",
            ]
        );
    }

    #[test]
    fn test_parse_tree_rejects_broken_documents() {
        assert!(parse_tree(b"<a><b></a>").is_err());
        assert!(parse_tree(b"").is_err());
        assert!(parse_tree(&[0xff, 0xfe]).is_err());
    }
}
